// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Array of equally sized f32 blocks laid out over up to four dimensions.
//!
//! ```text
//! BBDMArrayBlockF32
//!   m_dims                 i32
//!   m_totalSize            i32          number of blocks
//!   elementsPerDimension   [i32; 4]     unused dimensions are 0
//!   m_data                 sequence<BaseF32>
//!     owner                i32
//!     data.data            sequence<f32>, width * height entries
//!     size                 { width, height }
//! ```

use hris_serialize::{DataType, ParseError, PopulateParams, PrimitiveKind, Schema, SchemaBuilder, Value};
use tracing::debug;

use crate::TYPE_NAME;

/// Highest supported dimensionality.
pub const MAX_DIMS: usize = 4;

/// Owner tag of freshly created blocks.
pub const DEFAULT_OWNER: i32 = 1;

const MAX_BLOCKS: i64 = 1 << 20;
const MAX_BLOCK_ELEMENTS: i64 = 1 << 24;

/// Width and height of one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseSize {
    pub width: i32,
    pub height: i32,
}

impl BaseSize {
    pub fn elements(&self) -> usize {
        (self.width.max(0) as usize) * (self.height.max(0) as usize)
    }
}

/// One block. `owner` is carried through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseF32 {
    pub owner: i32,
    pub data: Vec<f32>,
    pub size: BaseSize,
}

impl BaseF32 {
    pub fn zeroed(size: BaseSize) -> Self {
        Self {
            owner: DEFAULT_OWNER,
            data: vec![0.0; size.elements()],
            size,
        }
    }
}

/// Shape used when building blocks from an init string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub dims: usize,
    pub extents: [i32; MAX_DIMS],
    pub block: BaseSize,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            dims: 1,
            extents: [2, 0, 0, 0],
            block: BaseSize {
                width: 4,
                height: 4,
            },
        }
    }
}

impl Layout {
    /// Parse `dims=2 extents=5,1 width=4 height=4`. Missing keys keep
    /// their defaults; missing extents of used dimensions are 1.
    pub fn parse(init: &str) -> Result<Self, ParseError> {
        let mut layout = Self::default();
        let mut dims = None;
        let mut extents: Option<Vec<i32>> = None;

        for pair in init.split_whitespace() {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| invalid("init", format!("expected key=value, found '{pair}'")))?;
            match key {
                "dims" => dims = Some(parse_int(key, value)? as usize),
                "extents" => {
                    extents = Some(
                        value
                            .split(',')
                            .filter(|v| !v.is_empty())
                            .map(|v| parse_int(key, v))
                            .collect::<Result<_, _>>()?,
                    )
                }
                "width" => layout.block.width = parse_int(key, value)?,
                "height" => layout.block.height = parse_int(key, value)?,
                other => return Err(invalid("init", format!("unknown option '{other}'"))),
            }
        }

        if let Some(extents) = extents {
            layout.dims = dims.unwrap_or(extents.len().max(1));
            if extents.len() > layout.dims || extents.len() > MAX_DIMS {
                return Err(invalid(
                    "extents",
                    format!("{} extents given for {} dimensions", extents.len(), layout.dims),
                ));
            }
            layout.extents = [0; MAX_DIMS];
            layout.extents[..extents.len()].copy_from_slice(&extents);
        } else if let Some(dims) = dims {
            layout.dims = dims;
        }
        for extent in layout.extents.iter_mut().take(layout.dims.min(MAX_DIMS)) {
            if *extent == 0 {
                *extent = 1;
            }
        }
        layout.validate()?;
        Ok(layout)
    }

    pub fn total(&self) -> i64 {
        self.extents[..self.dims.min(MAX_DIMS)]
            .iter()
            .map(|&e| i64::from(e))
            .product()
    }

    fn validate(&self) -> Result<(), ParseError> {
        if !(1..=MAX_DIMS).contains(&self.dims) {
            return Err(invalid("dims", format!("{} is outside 1..={MAX_DIMS}", self.dims)));
        }
        if self.extents[..self.dims].iter().any(|&e| e <= 0) {
            return Err(invalid("extents", "extents must be positive"));
        }
        if self.total() > MAX_BLOCKS {
            return Err(invalid("extents", format!("more than {MAX_BLOCKS} blocks")));
        }
        let BaseSize { width, height } = self.block;
        if width <= 0 || height <= 0 || i64::from(width) * i64::from(height) > MAX_BLOCK_ELEMENTS {
            return Err(invalid("size", format!("unsupported block size {width}x{height}")));
        }
        Ok(())
    }
}

/// The `BBDMArrayBlockF32` data type.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayBlockF32 {
    dims: i32,
    extents: [i32; MAX_DIMS],
    blocks: Vec<BaseF32>,
    layout: Layout,
}

impl Default for ArrayBlockF32 {
    fn default() -> Self {
        Self::with_layout(Layout::default())
    }
}

impl ArrayBlockF32 {
    /// Zero-filled blocks in the given layout.
    pub fn with_layout(layout: Layout) -> Self {
        let blocks = (0..layout.total()).map(|_| BaseF32::zeroed(layout.block)).collect();
        Self {
            dims: layout.dims as i32,
            extents: layout.extents,
            blocks,
            layout,
        }
    }

    pub fn dims(&self) -> i32 {
        self.dims
    }

    pub fn total_size(&self) -> i32 {
        self.blocks.len() as i32
    }

    pub fn elements_per_dimension(&self) -> [i32; MAX_DIMS] {
        self.extents
    }

    pub fn blocks(&self) -> &[BaseF32] {
        &self.blocks
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }
}

impl DataType for ArrayBlockF32 {
    const SUPPORTS_INIT: bool = true;
    const SUPPORTS_POPULATE: bool = true;

    fn schema() -> Schema {
        let dimensions = SchemaBuilder::new("ArrayBlockDimensions")
            .array_field("elementsPerDimension", PrimitiveKind::I32, MAX_DIMS)
            .build();
        let memory = SchemaBuilder::new("MemoryF32")
            .sequence_field("data", PrimitiveKind::F32)
            .build();
        let size = SchemaBuilder::new("BaseSize")
            .field("width", PrimitiveKind::I32)
            .field("height", PrimitiveKind::I32)
            .build();
        let block = SchemaBuilder::new("BaseF32")
            .field("owner", PrimitiveKind::I32)
            .struct_field("data", memory)
            .struct_field("size", size)
            .build();
        SchemaBuilder::new(TYPE_NAME)
            .field("m_dims", PrimitiveKind::I32)
            .field("m_totalSize", PrimitiveKind::I32)
            .struct_field("elementsPerDimension", dimensions)
            .struct_sequence_field("m_data", block)
            .build()
    }

    fn to_value(&self) -> Value {
        let blocks = self
            .blocks
            .iter()
            .map(|block| {
                Value::structure([
                    ("owner", Value::I32(block.owner)),
                    (
                        "data",
                        Value::structure([(
                            "data",
                            Value::Sequence(block.data.iter().copied().map(Value::F32).collect()),
                        )]),
                    ),
                    (
                        "size",
                        Value::structure([
                            ("width", Value::I32(block.size.width)),
                            ("height", Value::I32(block.size.height)),
                        ]),
                    ),
                ])
            })
            .collect();
        Value::structure([
            ("m_dims", Value::I32(self.dims)),
            ("m_totalSize", Value::I32(self.total_size())),
            (
                "elementsPerDimension",
                Value::structure([(
                    "elementsPerDimension",
                    Value::Array(self.extents.iter().copied().map(Value::I32).collect()),
                )]),
            ),
            ("m_data", Value::Sequence(blocks)),
        ])
    }

    fn from_value(value: &Value) -> Result<Self, ParseError> {
        let dims = int(value, "m_dims")?;
        let total = int(value, "m_totalSize")?;
        let extents_value = member(member(value, "elementsPerDimension")?, "elementsPerDimension")?;
        let extents = ints(extents_value, "elementsPerDimension.elementsPerDimension")?;
        let extents: [i32; MAX_DIMS] = extents
            .try_into()
            .map_err(|_| invalid("elementsPerDimension.elementsPerDimension", "expected 4 extents"))?;

        let used = usize::try_from(dims)
            .ok()
            .filter(|d| (1..=MAX_DIMS).contains(d))
            .ok_or_else(|| invalid("m_dims", format!("{dims} is outside 1..={MAX_DIMS}")))?;

        let items = member(value, "m_data")?
            .elements()
            .ok_or_else(|| invalid("m_data", "expected a sequence"))?;
        if i64::from(total) != items.len() as i64 {
            return Err(invalid(
                "m_totalSize",
                format!("{total} does not match the {} blocks present", items.len()),
            ));
        }
        let product: i64 = extents[..used].iter().map(|&e| i64::from(e)).product();
        if product != i64::from(total) {
            return Err(invalid(
                "elementsPerDimension.elementsPerDimension",
                format!("extents {:?} multiply to {product}, not {total}", &extents[..used]),
            ));
        }
        if extents[used..].iter().any(|&e| e != 0) {
            return Err(invalid(
                "elementsPerDimension.elementsPerDimension",
                "unused dimensions must be 0",
            ));
        }

        let blocks = items
            .iter()
            .enumerate()
            .map(|(i, item)| block_from_value(item, &format!("m_data[{i}]")))
            .collect::<Result<Vec<_>, _>>()?;

        let layout = Layout {
            dims: used,
            extents,
            block: blocks.first().map(|b| b.size).unwrap_or(Layout::default().block),
        };
        Ok(Self {
            dims,
            extents,
            blocks,
            layout,
        })
    }

    fn init(&mut self, init: &str) -> Result<(), ParseError> {
        let layout = Layout::parse(init)?;
        debug!(?layout, "array block layout");
        *self = Self::with_layout(layout);
        Ok(())
    }

    fn populate(&mut self, params: &PopulateParams) {
        if params.randomize {
            let mut rng = fastrand::Rng::with_seed(params.seed);
            let (min, max) = (params.value_min, params.value_max);
            for block in &mut self.blocks {
                for v in &mut block.data {
                    *v = (min + rng.f64() * (max - min)) as f32;
                }
            }
        } else {
            // Record index in the thousands, position below.
            let base = (params.index as f32) * 1000.0;
            let mut position = 0u32;
            for block in &mut self.blocks {
                for v in &mut block.data {
                    *v = base + position as f32;
                    position += 1;
                }
            }
        }
        for block in &mut self.blocks {
            block.owner = DEFAULT_OWNER;
        }
    }
}

fn block_from_value(value: &Value, path: &str) -> Result<BaseF32, ParseError> {
    let owner = int(value, "owner").map_err(|e| prefixed(path, e))?;
    let size = member(value, "size").map_err(|e| prefixed(path, e))?;
    let size = BaseSize {
        width: int(size, "width").map_err(|e| prefixed(&format!("{path}.size"), e))?,
        height: int(size, "height").map_err(|e| prefixed(&format!("{path}.size"), e))?,
    };
    if size.width < 0 || size.height < 0 {
        return Err(invalid(&format!("{path}.size"), "negative block size"));
    }
    let data = member(value, "data")
        .and_then(|memory| member(memory, "data"))
        .map_err(|e| prefixed(path, e))?
        .elements()
        .ok_or_else(|| invalid(&format!("{path}.data.data"), "expected a sequence"))?
        .iter()
        .map(|v| v.as_f32().ok_or_else(|| invalid(&format!("{path}.data.data"), "expected float")))
        .collect::<Result<Vec<f32>, _>>()?;
    if data.len() != size.elements() {
        return Err(invalid(
            &format!("{path}.data.data"),
            format!(
                "{} values for a {}x{} block",
                data.len(),
                size.width,
                size.height
            ),
        ));
    }
    Ok(BaseF32 { owner, data, size })
}

fn invalid(path: &str, reason: impl Into<String>) -> ParseError {
    ParseError::InvalidData {
        path: path.to_string(),
        reason: reason.into(),
    }
}

fn prefixed(prefix: &str, err: ParseError) -> ParseError {
    match err {
        ParseError::InvalidData { path, reason } => ParseError::InvalidData {
            path: format!("{prefix}.{path}"),
            reason,
        },
        other => other,
    }
}

fn member<'a>(value: &'a Value, name: &str) -> Result<&'a Value, ParseError> {
    value.field(name).ok_or_else(|| invalid(name, "missing field"))
}

fn int(value: &Value, name: &str) -> Result<i32, ParseError> {
    member(value, name)?
        .as_i32()
        .ok_or_else(|| invalid(name, "expected int"))
}

fn ints(value: &Value, path: &str) -> Result<Vec<i32>, ParseError> {
    value
        .elements()
        .ok_or_else(|| invalid(path, "expected an array"))?
        .iter()
        .map(|v| v.as_i32().ok_or_else(|| invalid(path, "expected int")))
        .collect()
}

fn parse_int(key: &str, text: &str) -> Result<i32, ParseError> {
    text.trim()
        .parse()
        .map_err(|_| invalid(key, format!("'{text}' is not an integer")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let block = ArrayBlockF32::default();
        assert_eq!(block.dims(), 1);
        assert_eq!(block.total_size(), 2);
        assert_eq!(block.elements_per_dimension(), [2, 0, 0, 0]);
        assert!(block.blocks().iter().all(|b| b.data.len() == 16 && b.owner == DEFAULT_OWNER));
    }

    #[test]
    fn test_layout_parse() {
        let layout = Layout::parse("dims=2 extents=5,1 width=4 height=4").expect("parse");
        assert_eq!(layout.dims, 2);
        assert_eq!(layout.extents, [5, 1, 0, 0]);
        assert_eq!(layout.total(), 5);

        let implied = Layout::parse("extents=2,3,4").expect("parse");
        assert_eq!(implied.dims, 3);
        assert_eq!(implied.total(), 24);

        let padded = Layout::parse("dims=3 extents=2").expect("parse");
        assert_eq!(padded.extents, [2, 1, 1, 0]);

        assert!(Layout::parse("dims=5").is_err());
        assert!(Layout::parse("dims=1 extents=2,2").is_err());
        assert!(Layout::parse("width=0").is_err());
        assert!(Layout::parse("depth=3").is_err());
        assert!(Layout::parse("width").is_err());
    }

    #[test]
    fn test_value_round_trip() {
        let mut block = ArrayBlockF32::default();
        block.init("dims=2 extents=3,2 width=2 height=3").expect("init");
        block.populate(&PopulateParams {
            index: 4,
            ..PopulateParams::default()
        });
        let value = block.to_value();
        value.conforms_to(&ArrayBlockF32::schema()).expect("conforms");
        assert_eq!(ArrayBlockF32::from_value(&value).expect("from_value"), block);
    }

    #[test]
    fn test_ramp_embeds_record_index() {
        let mut first = ArrayBlockF32::default();
        let mut second = ArrayBlockF32::default();
        first.populate(&PopulateParams::default());
        second.populate(&PopulateParams {
            index: 1,
            ..PopulateParams::default()
        });
        assert_eq!(first.blocks()[0].data[0], 0.0);
        assert_eq!(second.blocks()[0].data[0], 1000.0);
        assert_eq!(second.blocks()[1].data[0], 1016.0);
    }

    #[test]
    fn test_random_values_stay_in_range_and_follow_seed() {
        let params = PopulateParams {
            seed: 42,
            randomize: true,
            value_min: -2.0,
            value_max: 3.0,
            ..PopulateParams::default()
        };
        let mut a = ArrayBlockF32::default();
        let mut b = ArrayBlockF32::default();
        a.populate(&params);
        b.populate(&params);
        assert_eq!(a, b);
        assert!(a
            .blocks()
            .iter()
            .flat_map(|blk| blk.data.iter())
            .all(|v| (-2.0..=3.0).contains(v)));

        let mut c = ArrayBlockF32::default();
        c.populate(&PopulateParams { seed: 43, ..params });
        assert_ne!(a, c);
    }

    fn with_field(value: &Value, name: &str, replacement: Value) -> Value {
        let mut value = value.clone();
        if let Value::Struct(map) = &mut value {
            map.insert(name.to_string(), replacement);
        }
        value
    }

    #[test]
    fn test_validation() {
        let value = ArrayBlockF32::default().to_value();

        let err = ArrayBlockF32::from_value(&with_field(&value, "m_totalSize", Value::I32(3)))
            .expect_err("total mismatch");
        assert!(matches!(err, ParseError::InvalidData { ref path, .. } if path == "m_totalSize"));

        let err = ArrayBlockF32::from_value(&with_field(&value, "m_dims", Value::I32(0)))
            .expect_err("dims");
        assert!(matches!(err, ParseError::InvalidData { ref path, .. } if path == "m_dims"));

        let extents = |e: [i32; 4]| {
            Value::structure([(
                "elementsPerDimension",
                Value::Array(e.iter().copied().map(Value::I32).collect()),
            )])
        };
        assert!(ArrayBlockF32::from_value(&with_field(&value, "elementsPerDimension", extents([1, 0, 0, 0])))
            .is_err());
        assert!(ArrayBlockF32::from_value(&with_field(&value, "elementsPerDimension", extents([2, 0, 0, 7])))
            .is_err());

        let short_block = Value::structure([
            ("owner", Value::I32(9)),
            ("data", Value::structure([("data", Value::Sequence(vec![Value::F32(1.0)]))])),
            (
                "size",
                Value::structure([("width", Value::I32(4)), ("height", Value::I32(4))]),
            ),
        ]);
        let blocks = Value::Sequence(vec![short_block.clone(), short_block]);
        let err = ArrayBlockF32::from_value(&with_field(&value, "m_data", blocks)).expect_err("short data");
        assert!(matches!(err, ParseError::InvalidData { ref path, .. } if path == "m_data[0].data.data"));
    }

    #[test]
    fn test_owner_is_preserved() {
        let mut value = ArrayBlockF32::default().to_value();
        if let Some(Value::Sequence(blocks)) = match &mut value {
            Value::Struct(map) => map.get_mut("m_data"),
            _ => None,
        } {
            if let Value::Struct(block) = &mut blocks[1] {
                block.insert("owner".into(), Value::I32(77));
            }
        }
        let block = ArrayBlockF32::from_value(&value).expect("from_value");
        assert_eq!(block.blocks()[1].owner, 77);
        assert_eq!(block.to_value(), value);
    }
}
