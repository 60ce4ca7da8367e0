//! # ABI Model
//!
//! Parameter types, function and event descriptors, and the [`Interface`]
//! built from a contract's JSON ABI.
//!
//! The interface is loaded once and exposes a static lookup table from
//! signature (and bare name) to descriptor.

use crate::codec::{eth, TypeCodec};
use crate::domain::entities::DecodedEvent;
use crate::domain::services::{event_topic, function_selector};
use crate::domain::value_objects::{AbiValue, EventData, Selector, Topic};
use crate::errors::AbiError;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

/// Integer widths accepted by `intN` / `uintN`.
pub const INTEGER_WIDTHS: [usize; 6] = [8, 16, 32, 64, 128, 256];

// =============================================================================
// ABI TYPE
// =============================================================================

/// A parameter type in the contract's ABI.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum AbiType {
    /// Signed integer of the given bit width.
    Int(usize),
    /// Unsigned integer of the given bit width.
    UInt(usize),
    /// `bytesN` with N in 1..=32.
    FixedBytes(usize),
    /// `bytes`.
    DynamicBytes,
    /// `string`.
    String,
    /// `bool`.
    Bool,
    /// 32-byte account address.
    Address,
    /// Ordered components.
    Tuple(Vec<AbiType>),
    /// Homogeneous elements; `None` length means dynamic.
    Array(Box<AbiType>, Option<usize>),
}

impl AbiType {
    /// Parses a canonical type string such as `uint64`, `bytes32[]` or `(int8,string)[2]`.
    pub fn parse(ty: &str) -> Result<Self, AbiError> {
        let ty = ty.trim();
        let unknown = || AbiError::UnknownType(ty.to_string());

        if let Some(stripped) = ty.strip_suffix(']') {
            let open = stripped.rfind('[').ok_or_else(unknown)?;
            let element = Self::parse(&stripped[..open])?;
            let len = &stripped[open + 1..];
            let length = if len.is_empty() {
                None
            } else {
                Some(len.parse::<usize>().map_err(|_| unknown())?)
            };
            return Ok(Self::Array(Box::new(element), length));
        }

        if let Some(inner) = ty.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
            let components = split_components(inner)
                .into_iter()
                .map(Self::parse)
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Self::Tuple(components));
        }

        match ty {
            "bool" => return Ok(Self::Bool),
            "string" => return Ok(Self::String),
            "address" => return Ok(Self::Address),
            "bytes" => return Ok(Self::DynamicBytes),
            "int" => return Ok(Self::Int(256)),
            "uint" => return Ok(Self::UInt(256)),
            _ => {}
        }

        if let Some(width) = ty.strip_prefix("uint") {
            return parse_width(width).map(Self::UInt).ok_or_else(unknown);
        }
        if let Some(width) = ty.strip_prefix("int") {
            return parse_width(width).map(Self::Int).ok_or_else(unknown);
        }
        if let Some(size) = ty.strip_prefix("bytes") {
            return match size.parse::<usize>() {
                Ok(n) if (1..=32).contains(&n) => Ok(Self::FixedBytes(n)),
                _ => Err(unknown()),
            };
        }

        Err(unknown())
    }

    /// Renders the type as it appears in a canonical signature.
    #[must_use]
    pub fn canonical(&self) -> String {
        match self {
            Self::Int(w) => format!("int{w}"),
            Self::UInt(w) => format!("uint{w}"),
            Self::FixedBytes(n) => format!("bytes{n}"),
            Self::DynamicBytes => "bytes".to_string(),
            Self::String => "string".to_string(),
            Self::Bool => "bool".to_string(),
            Self::Address => "address".to_string(),
            Self::Tuple(components) => {
                let inner: Vec<String> = components.iter().map(Self::canonical).collect();
                format!("({})", inner.join(","))
            }
            Self::Array(element, None) => format!("{}[]", element.canonical()),
            Self::Array(element, Some(n)) => format!("{}[{n}]", element.canonical()),
        }
    }

    /// True if the type has no fixed encoded size in the Ethereum ABI.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        match self {
            Self::DynamicBytes | Self::String | Self::Array(_, None) => true,
            Self::Array(element, Some(_)) => element.is_dynamic(),
            Self::Tuple(components) => components.iter().any(Self::is_dynamic),
            _ => false,
        }
    }
}

impl fmt::Display for AbiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl fmt::Debug for AbiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AbiType({})", self.canonical())
    }
}

fn parse_width(width: &str) -> Option<usize> {
    let w = width.parse::<usize>().ok()?;
    INTEGER_WIDTHS.contains(&w).then_some(w)
}

/// Splits `a,(b,c),d[]` on top-level commas.
fn split_components(inner: &str) -> Vec<&str> {
    if inner.trim().is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&inner[start..]);
    parts
}

// =============================================================================
// DESCRIPTORS
// =============================================================================

/// A named, typed parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Parameter name (may be empty).
    pub name: String,
    /// Parameter type.
    pub ty: AbiType,
    /// Event parameters only: carried in a topic rather than the data.
    pub indexed: bool,
}

/// Collects the types of a parameter list.
#[must_use]
pub fn param_types(params: &[Param]) -> Vec<AbiType> {
    params.iter().map(|p| p.ty.clone()).collect()
}

/// How a function interacts with contract state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StateMutability {
    /// Reads nothing from state.
    Pure,
    /// Reads but never writes state.
    View,
    /// May write state.
    #[default]
    NonPayable,
    /// May write state and accept value.
    Payable,
}

impl StateMutability {
    fn from_entry(entry: &JsonEntry) -> Self {
        match entry.state_mutability.as_deref() {
            Some("pure") => Self::Pure,
            Some("view") => Self::View,
            Some("payable") => Self::Payable,
            Some(_) => Self::NonPayable,
            None if entry.constant => Self::View,
            None if entry.payable => Self::Payable,
            None => Self::NonPayable,
        }
    }
}

/// A callable contract function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDescriptor {
    /// Function name.
    pub name: String,
    /// Canonical signature, e.g. `transfer(address,uint64)`.
    pub signature: String,
    /// First four bytes of `keccak256(signature)`.
    pub selector: Selector,
    /// Input parameters.
    pub inputs: Vec<Param>,
    /// Output parameters.
    pub outputs: Vec<Param>,
    /// Declared mutability.
    pub mutability: StateMutability,
}

impl FunctionDescriptor {
    /// True for `view` and `pure` functions, which are always simulated.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        matches!(
            self.mutability,
            StateMutability::View | StateMutability::Pure
        )
    }

    /// Input types in declaration order.
    #[must_use]
    pub fn input_types(&self) -> Vec<AbiType> {
        param_types(&self.inputs)
    }

    /// Output types in declaration order.
    #[must_use]
    pub fn output_types(&self) -> Vec<AbiType> {
        param_types(&self.outputs)
    }
}

/// The contract's constructor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConstructorDescriptor {
    /// Constructor parameters.
    pub inputs: Vec<Param>,
    /// Declared mutability.
    pub mutability: StateMutability,
}

/// An event the contract can emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDescriptor {
    /// Event name.
    pub name: String,
    /// Canonical signature, e.g. `Second(int64,bytes4,bytes)`.
    pub signature: String,
    /// `keccak256(signature)`, carried as the first topic.
    pub topic: Topic,
    /// Parameters, with their indexed flags.
    pub inputs: Vec<Param>,
    /// Anonymous events carry no signature topic.
    pub anonymous: bool,
}

fn signature_of(name: &str, inputs: &[Param]) -> String {
    let types: Vec<String> = inputs.iter().map(|p| p.ty.canonical()).collect();
    format!("{name}({})", types.join(","))
}

// =============================================================================
// JSON LAYOUT
// =============================================================================

#[derive(Debug, Deserialize)]
struct JsonParam {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    components: Vec<JsonParam>,
    #[serde(default)]
    indexed: bool,
}

impl JsonParam {
    fn resolve_type(&self) -> Result<AbiType, AbiError> {
        let Some(suffix) = self.ty.strip_prefix("tuple") else {
            return AbiType::parse(&self.ty);
        };
        let components = self
            .components
            .iter()
            .map(Self::resolve_type)
            .collect::<Result<Vec<_>, _>>()?;

        // Wrap the tuple in each array suffix, innermost first.
        let mut ty = AbiType::Tuple(components);
        let mut rest = suffix;
        while !rest.is_empty() {
            let close = rest
                .find(']')
                .filter(|_| rest.starts_with('['))
                .ok_or_else(|| AbiError::UnknownType(self.ty.clone()))?;
            let len = &rest[1..close];
            let length = if len.is_empty() {
                None
            } else {
                Some(
                    len.parse::<usize>()
                        .map_err(|_| AbiError::UnknownType(self.ty.clone()))?,
                )
            };
            ty = AbiType::Array(Box::new(ty), length);
            rest = &rest[close + 1..];
        }
        Ok(ty)
    }

    fn into_param(self) -> Result<Param, AbiError> {
        let ty = self.resolve_type()?;
        Ok(Param {
            name: self.name,
            ty,
            indexed: self.indexed,
        })
    }
}

fn default_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonEntry {
    #[serde(rename = "type", default = "default_kind")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<JsonParam>,
    #[serde(default)]
    outputs: Vec<JsonParam>,
    #[serde(default)]
    state_mutability: Option<String>,
    #[serde(default)]
    constant: bool,
    #[serde(default)]
    payable: bool,
    #[serde(default)]
    anonymous: bool,
}

fn convert_params(params: Vec<JsonParam>) -> Result<Vec<Param>, AbiError> {
    params.into_iter().map(JsonParam::into_param).collect()
}

// =============================================================================
// INTERFACE
// =============================================================================

/// A contract's parsed ABI.
#[derive(Debug, Clone, Default)]
pub struct Interface {
    constructor: Option<ConstructorDescriptor>,
    functions: HashMap<String, FunctionDescriptor>,
    by_name: HashMap<String, Vec<String>>,
    events: HashMap<Topic, EventDescriptor>,
}

impl Interface {
    /// Loads an interface from ABI JSON.
    ///
    /// Accepts either a bare array of entries or an object with an `abi` key.
    pub fn from_json(json: &str) -> Result<Self, AbiError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| AbiError::Json(e.to_string()))?;
        let entries = match value {
            serde_json::Value::Object(mut map) => map
                .remove("abi")
                .ok_or_else(|| AbiError::Json("object has no `abi` key".to_string()))?,
            other => other,
        };
        let entries: Vec<JsonEntry> =
            serde_json::from_value(entries).map_err(|e| AbiError::Json(e.to_string()))?;

        let mut interface = Self::default();
        for entry in entries {
            interface.add_entry(entry)?;
        }
        Ok(interface)
    }

    fn add_entry(&mut self, entry: JsonEntry) -> Result<(), AbiError> {
        let mutability = StateMutability::from_entry(&entry);
        match entry.kind.as_str() {
            "function" => {
                let inputs = convert_params(entry.inputs)?;
                let outputs = convert_params(entry.outputs)?;
                let signature = signature_of(&entry.name, &inputs);
                let descriptor = FunctionDescriptor {
                    selector: function_selector(&signature),
                    name: entry.name.clone(),
                    signature: signature.clone(),
                    inputs,
                    outputs,
                    mutability,
                };
                let overloads = self.by_name.entry(entry.name).or_default();
                if !overloads.contains(&signature) {
                    overloads.push(signature.clone());
                }
                self.functions.insert(signature, descriptor);
            }
            "constructor" => {
                self.constructor = Some(ConstructorDescriptor {
                    inputs: convert_params(entry.inputs)?,
                    mutability,
                });
            }
            "event" => {
                let inputs = convert_params(entry.inputs)?;
                let signature = signature_of(&entry.name, &inputs);
                let topic = event_topic(&signature);
                self.events.insert(
                    topic,
                    EventDescriptor {
                        name: entry.name,
                        signature,
                        topic,
                        inputs,
                        anonymous: entry.anonymous,
                    },
                );
            }
            // fallback, receive and error entries are not callable through the bridge
            _ => {}
        }
        Ok(())
    }

    /// The constructor, if the ABI declares one.
    #[must_use]
    pub fn constructor(&self) -> Option<&ConstructorDescriptor> {
        self.constructor.as_ref()
    }

    /// Constructor parameters (empty when no constructor is declared).
    #[must_use]
    pub fn constructor_inputs(&self) -> &[Param] {
        self.constructor
            .as_ref()
            .map_or(&[][..], |c| c.inputs.as_slice())
    }

    /// Resolves a function by full signature or by unambiguous bare name.
    pub fn function(&self, key: &str) -> Result<&FunctionDescriptor, AbiError> {
        if key.contains('(') {
            return self
                .functions
                .get(key)
                .ok_or_else(|| AbiError::UnknownFunction(key.to_string()));
        }
        match self.by_name.get(key).map(Vec::as_slice) {
            Some([signature]) => self
                .functions
                .get(signature)
                .ok_or_else(|| AbiError::UnknownFunction(key.to_string())),
            Some(candidates) if !candidates.is_empty() => {
                let mut candidates = candidates.to_vec();
                candidates.sort();
                Err(AbiError::AmbiguousFunction {
                    name: key.to_string(),
                    candidates,
                })
            }
            _ => Err(AbiError::UnknownFunction(key.to_string())),
        }
    }

    /// All functions, in no particular order.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDescriptor> {
        self.functions.values()
    }

    /// All events, in no particular order.
    pub fn events(&self) -> impl Iterator<Item = &EventDescriptor> {
        self.events.values()
    }

    /// Looks up an event by its signature topic.
    #[must_use]
    pub fn event_by_topic(&self, topic: &Topic) -> Option<&EventDescriptor> {
        self.events.get(topic).filter(|e| !e.anonymous)
    }

    /// Looks up an event by name or signature.
    #[must_use]
    pub fn event(&self, key: &str) -> Option<&EventDescriptor> {
        self.events
            .values()
            .find(|e| e.signature == key || e.name == key)
    }

    /// Decodes a raw event against this interface.
    ///
    /// Indexed value types are decoded from their topic word. Indexed
    /// dynamic types only carry a hash, returned as 32 fixed bytes.
    pub fn decode_event(
        &self,
        event: &EventData,
        codec: &dyn TypeCodec,
    ) -> Result<DecodedEvent, AbiError> {
        let topic0 = event
            .topics
            .first()
            .ok_or_else(|| AbiError::UnknownEvent(String::new()))?;
        let descriptor = self
            .event_by_topic(topic0)
            .ok_or_else(|| AbiError::UnknownEvent(hex::encode(topic0)))?;

        let indexed_count = descriptor.inputs.iter().filter(|p| p.indexed).count();
        let topic_count = event.topics.len() - 1;
        if topic_count != indexed_count {
            return Err(AbiError::TopicCount {
                event: descriptor.signature.clone(),
                expected: indexed_count,
                found: topic_count,
            });
        }

        let body_types: Vec<AbiType> = descriptor
            .inputs
            .iter()
            .filter(|p| !p.indexed)
            .map(|p| p.ty.clone())
            .collect();
        let mut body = codec.decode(&body_types, &event.data)?.into_iter();
        let mut topics = event.topics[1..].iter();

        let mut args = Vec::with_capacity(descriptor.inputs.len());
        for param in &descriptor.inputs {
            let value = if param.indexed {
                let topic = topics.next().ok_or_else(|| AbiError::TopicCount {
                    event: descriptor.signature.clone(),
                    expected: indexed_count,
                    found: topic_count,
                })?;
                eth::decode_topic(&param.ty, topic)?
            } else {
                body.next().ok_or_else(|| {
                    AbiError::UnknownEvent(format!("{} body too short", descriptor.signature))
                })?
            };
            args.push(value);
        }

        Ok(DecodedEvent {
            name: descriptor.name.clone(),
            signature: descriptor.signature.clone(),
            arg_names: descriptor.inputs.iter().map(|p| p.name.clone()).collect(),
            args,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
