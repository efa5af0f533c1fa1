//! Test suite loading and signature descriptors.
//!
//! A signature descriptor says what each argument looks like on the wire so
//! the driver can derive the buffer shape it expects before running a call.

use std::fmt;
use std::mem::size_of;

use abicafe_capture::{PointerCapture, Representation};
use serde::{Deserialize, Serialize};

/// Kind of one recorded scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    U8,
    U64,
    F32,
    /// 128-bit integer in any representation.
    Wide,
    /// A data pointer; what gets recorded depends on [`PointerCapture`].
    Ptr,
}

impl ScalarKind {
    /// Recorded byte length on the current target.
    #[must_use]
    pub const fn byte_len(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U64 => 8,
            Self::F32 => 4,
            Self::Wide => 16,
            Self::Ptr => size_of::<usize>(),
        }
    }
}

/// One field of a struct argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: ScalarKind,
    /// For `ptr` fields, the kind of the pointed-to value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointee: Option<ScalarKind>,
}

impl FieldSpec {
    fn scalar(name: &str, kind: ScalarKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            pointee: None,
        }
    }

    fn pointer(name: &str, pointee: ScalarKind) -> Self {
        Self {
            name: name.to_string(),
            kind: ScalarKind::Ptr,
            pointee: Some(pointee),
        }
    }
}

/// How an argument is passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "pass", rename_all = "snake_case")]
pub enum ArgPass {
    Scalar { kind: ScalarKind },
    /// A pointer to a scalar; the pointee is recorded.
    ScalarByPointer { kind: ScalarKind },
    StructByValue { fields: Vec<FieldSpec> },
    /// A pointer to a struct; the pointee's fields are recorded.
    StructByPointer { fields: Vec<FieldSpec> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgSpec {
    pub name: String,
    #[serde(flatten)]
    pub pass: ArgPass,
}

/// The logical signature shared by every representation of a fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub args: Vec<ArgSpec>,
    pub result: ScalarKind,
}

/// Per-group field byte lengths of one buffer.
pub type Shape = Vec<Vec<usize>>;

fn struct_groups(fields: &[FieldSpec], mode: PointerCapture, out: &mut Shape) {
    let mut group = Vec::with_capacity(fields.len());
    let mut extra = Vec::new();
    for field in fields {
        let pointee_len = field.pointee.map_or(0, ScalarKind::byte_len);
        match (field.kind, mode) {
            (ScalarKind::Ptr, PointerCapture::Pointee) => group.push(pointee_len),
            (ScalarKind::Ptr, PointerCapture::Both) => {
                group.push(field.kind.byte_len());
                extra.push(vec![pointee_len]);
            }
            (kind, _) => group.push(kind.byte_len()),
        }
    }
    out.push(group);
    out.extend(extra);
}

impl Signature {
    /// Expected shape of either inputs buffer.
    #[must_use]
    pub fn input_shape(&self, mode: PointerCapture) -> Shape {
        let mut out = Vec::new();
        for arg in &self.args {
            match &arg.pass {
                ArgPass::Scalar { kind } | ArgPass::ScalarByPointer { kind } => {
                    out.push(vec![kind.byte_len()]);
                }
                ArgPass::StructByValue { fields } | ArgPass::StructByPointer { fields } => {
                    struct_groups(fields, mode, &mut out);
                }
            }
        }
        out
    }

    /// Expected shape of either outputs buffer.
    #[must_use]
    pub fn output_shape(&self) -> Shape {
        vec![vec![self.result.byte_len()]]
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (idx, arg) in self.args.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            let pass = match &arg.pass {
                ArgPass::Scalar { .. } => "",
                ArgPass::ScalarByPointer { .. } | ArgPass::StructByPointer { .. } => "&",
                ArgPass::StructByValue { .. } => "struct ",
            };
            write!(f, "{pass}{}", arg.name)?;
        }
        write!(f, ") -> {:?}", self.result)
    }
}

/// One logical test: a signature and the representations it runs in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub signature: Signature,
    pub variants: Vec<Representation>,
}

/// A collection of test cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuite {
    /// Schema version.
    pub version: String,
    /// Suite name.
    pub suite: String,
    pub cases: Vec<TestCase>,
}

impl TestSuite {
    /// Load a suite from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the suite to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load a suite from a file path.
    pub fn from_file(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let suite = Self::from_json(&content)?;
        Ok(suite)
    }

    /// The suite compiled into this binary.
    #[must_use]
    pub fn builtin() -> Self {
        let cases = compiled_signatures()
            .into_iter()
            .map(|signature| {
                let (description, variants) = match signature.name.as_str() {
                    I128_SIX_ARGS => (
                        "wide integers in registers and on the stack around an f32 and a u8",
                        Representation::ALL.to_vec(),
                    ),
                    I128_BY_REF => (
                        "wide integers passed by pointer",
                        Representation::ALL.to_vec(),
                    ),
                    _ => (
                        "struct with a pointer field, once by pointer and once by value",
                        vec![Representation::Native],
                    ),
                };
                TestCase {
                    name: signature.name.clone(),
                    description: description.to_string(),
                    signature,
                    variants,
                }
            })
            .collect();
        Self {
            version: "v1".to_string(),
            suite: "builtin".to_string(),
            cases,
        }
    }

    #[must_use]
    pub fn case(&self, name: &str) -> Option<&TestCase> {
        self.cases.iter().find(|c| c.name == name)
    }
}

pub const I128_SIX_ARGS: &str = "i128_six_args";
pub const I128_BY_REF: &str = "i128_by_ref";
pub const PAIR_BY_REF_AND_VALUE: &str = "pair_by_ref_and_value";

/// Descriptor of a compiled fixture signature.
#[must_use]
pub fn builtin_signature(name: &str) -> Option<Signature> {
    compiled_signatures().into_iter().find(|s| s.name == name)
}

fn compiled_signatures() -> Vec<Signature> {
    let scalar = |name: &str, kind| ArgSpec {
        name: name.to_string(),
        pass: ArgPass::Scalar { kind },
    };
    let wide_ref = |name: &str| ArgSpec {
        name: name.to_string(),
        pass: ArgPass::ScalarByPointer {
            kind: ScalarKind::Wide,
        },
    };
    let pair_fields = || {
        vec![
            FieldSpec::scalar("value", ScalarKind::U64),
            FieldSpec::pointer("target", ScalarKind::U64),
        ]
    };

    vec![
        Signature {
            name: I128_SIX_ARGS.to_string(),
            args: vec![
                scalar("a0", ScalarKind::Wide),
                scalar("a1", ScalarKind::Wide),
                scalar("a2", ScalarKind::F32),
                scalar("a3", ScalarKind::Wide),
                scalar("a4", ScalarKind::U8),
                scalar("a5", ScalarKind::Wide),
            ],
            result: ScalarKind::Wide,
        },
        Signature {
            name: I128_BY_REF.to_string(),
            args: vec![wide_ref("a0"), wide_ref("a1"), wide_ref("a2")],
            result: ScalarKind::Wide,
        },
        Signature {
            name: PAIR_BY_REF_AND_VALUE.to_string(),
            args: vec![
                ArgSpec {
                    name: "by_ref".to_string(),
                    pass: ArgPass::StructByPointer {
                        fields: pair_fields(),
                    },
                },
                ArgSpec {
                    name: "by_value".to_string(),
                    pass: ArgPass::StructByValue {
                        fields: pair_fields(),
                    },
                },
            ],
            result: ScalarKind::U64,
        },
    ]
}
