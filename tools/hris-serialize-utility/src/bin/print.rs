// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::process::ExitCode;

use clap::Parser;
use hris_serialize_utility::{init_logging, report, PrintArgs};

fn main() -> ExitCode {
    let args = PrintArgs::parse();
    init_logging(args.common.log_filter());
    let registry = args.common.registry();
    report(args.run(&registry)).into()
}
