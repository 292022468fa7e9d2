//! Contract ABI function table, calldata checks and result decoding.
//!
//! # Responsibilities
//! - Build the function table (name → selector, inputs, outputs) from an artifact ABI
//! - Encode typed arguments (text, JSON arrays/objects) into calldata
//! - Reject calldata that does not decode against a function's input types
//! - Decode returned felts into structured values following the output types
//!
//! Types not described by the ABI and not built into the core library are
//! treated as opaque: argument checks are skipped and outputs are returned raw.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{json, Map, Value as JsonValue};
use starknet::core::types::Felt;
use starknet::core::utils::get_selector_from_name;

use crate::chain::types::{
    felt_hex, felt_to_u128, parse_arg, parse_felt, ChainError, ChainResult, Uint256,
};

/// Whether a function may change contract state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutability {
    View,
    External,
}

/// Named, typed parameter or member.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Member {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, Deserialize)]
struct Output {
    #[serde(rename = "type")]
    ty: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawEntry {
    Function(RawFunction),
    L1Handler(RawFunction),
    Constructor(RawConstructor),
    Struct(RawStruct),
    Enum(RawEnum),
    Interface(RawInterface),
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct RawFunction {
    name: String,
    #[serde(default)]
    inputs: Vec<Member>,
    #[serde(default)]
    outputs: Vec<Output>,
    state_mutability: Option<Mutability>,
}

#[derive(Debug, Deserialize)]
struct RawConstructor {
    #[serde(default)]
    inputs: Vec<Member>,
}

#[derive(Debug, Deserialize)]
struct RawStruct {
    name: String,
    #[serde(default)]
    members: Vec<Member>,
}

#[derive(Debug, Deserialize)]
struct RawEnum {
    name: String,
    #[serde(default)]
    variants: Vec<Member>,
}

#[derive(Debug, Deserialize)]
struct RawInterface {
    #[serde(default)]
    items: Vec<RawEntry>,
}

/// The ABI field is an array in compiled artifacts and a JSON string in
/// flattened classes returned by nodes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AbiField {
    Entries(Vec<RawEntry>),
    Encoded(String),
}

/// A callable entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionAbi {
    pub name: String,
    pub selector: Felt,
    pub inputs: Vec<Member>,
    pub outputs: Vec<String>,
    pub mutability: Mutability,
}

impl FunctionAbi {
    /// `name(arg: type, ..) -> output` with module paths stripped.
    pub fn signature(&self) -> String {
        let inputs: Vec<String> = self
            .inputs
            .iter()
            .map(|m| format!("{}: {}", m.name, short_type(&m.ty)))
            .collect();
        let outputs: Vec<String> = self.outputs.iter().map(|ty| short_type(ty)).collect();
        match outputs.len() {
            0 => format!("{}({})", self.name, inputs.join(", ")),
            _ => format!("{}({}) -> {}", self.name, inputs.join(", "), outputs.join(", ")),
        }
    }
}

/// Function table and type definitions of one contract class.
#[derive(Debug, Clone, Default)]
pub struct ContractAbi {
    functions: HashMap<String, FunctionAbi>,
    constructor: Vec<Member>,
    structs: HashMap<String, Vec<Member>>,
    enums: HashMap<String, Vec<Member>>,
}

impl ContractAbi {
    /// Build from the `abi` field of an artifact.
    pub fn from_value(abi: &JsonValue) -> Result<Self, String> {
        let field: AbiField =
            serde_json::from_value(abi.clone()).map_err(|e| format!("invalid ABI: {}", e))?;
        let entries = match field {
            AbiField::Entries(entries) => entries,
            AbiField::Encoded(text) => {
                serde_json::from_str(&text).map_err(|e| format!("invalid ABI string: {}", e))?
            }
        };

        let mut abi = Self::default();
        abi.collect(entries)?;
        Ok(abi)
    }

    fn collect(&mut self, entries: Vec<RawEntry>) -> Result<(), String> {
        for entry in entries {
            match entry {
                RawEntry::Function(f) | RawEntry::L1Handler(f) => {
                    let selector = get_selector_from_name(&f.name)
                        .map_err(|_| format!("function name '{}' is not ASCII", f.name))?;
                    self.functions.insert(
                        f.name.clone(),
                        FunctionAbi {
                            name: f.name,
                            selector,
                            inputs: f.inputs,
                            outputs: f.outputs.into_iter().map(|o| o.ty).collect(),
                            mutability: f.state_mutability.unwrap_or(Mutability::External),
                        },
                    );
                }
                RawEntry::Constructor(c) => self.constructor = c.inputs,
                RawEntry::Struct(s) => {
                    self.structs.insert(s.name, s.members);
                }
                RawEntry::Enum(e) => {
                    self.enums.insert(e.name, e.variants);
                }
                RawEntry::Interface(i) => self.collect(i.items)?,
                RawEntry::Other => {}
            }
        }
        Ok(())
    }

    pub fn function(&self, name: &str) -> ChainResult<&FunctionAbi> {
        self.functions
            .get(name)
            .ok_or_else(|| ChainError::UnknownFunction(name.to_string()))
    }

    /// Function names, sorted.
    pub fn function_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// All entry points, sorted by name.
    pub fn functions(&self) -> Vec<&FunctionAbi> {
        let mut functions: Vec<&FunctionAbi> = self.functions.values().collect();
        functions.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        functions
    }

    pub fn constructor_inputs(&self) -> &[Member] {
        &self.constructor
    }

    /// Encode one argument per declared input into calldata.
    pub fn encode_args(&self, function: &FunctionAbi, args: &[JsonValue]) -> ChainResult<Vec<Felt>> {
        self.encode_members(&function.name, &function.inputs, args)
    }

    /// Encode constructor arguments into calldata.
    pub fn encode_constructor_args(&self, args: &[JsonValue]) -> ChainResult<Vec<Felt>> {
        self.encode_members("constructor", &self.constructor, args)
    }

    fn encode_members(
        &self,
        context: &str,
        members: &[Member],
        args: &[JsonValue],
    ) -> ChainResult<Vec<Felt>> {
        if args.len() != members.len() {
            return Err(ChainError::InvalidArgument(format!(
                "{}: expected {} arguments, got {}",
                context,
                members.len(),
                args.len()
            )));
        }
        let mut calldata = Vec::new();
        for (member, arg) in members.iter().zip(args) {
            self.encode(&member.ty, arg, &mut calldata).map_err(|e| {
                ChainError::InvalidArgument(format!(
                    "{}: argument '{}' ({}): {}",
                    context, member.name, member.ty, e
                ))
            })?;
        }
        Ok(calldata)
    }

    fn encode(&self, ty: &str, arg: &JsonValue, out: &mut Vec<Felt>) -> Result<(), EncodeError> {
        let ty = ty.trim();
        let mismatch = || EncodeError::Mismatch(ty.to_string(), arg.to_string());

        if ty == "()" {
            return Ok(());
        }
        if FELT_TYPES.contains(&ty) {
            let felt = match arg {
                JsonValue::String(text) => parse_arg(text).map_err(|_| mismatch())?,
                JsonValue::Number(n) => Felt::from(n.as_u64().ok_or_else(mismatch)?),
                _ => return Err(mismatch()),
            };
            out.push(felt);
            return Ok(());
        }
        if ty == "core::bool" {
            let value = match arg {
                JsonValue::Bool(b) => *b,
                JsonValue::String(text) => match text.trim() {
                    "true" | "1" => true,
                    "false" | "0" => false,
                    _ => return Err(mismatch()),
                },
                JsonValue::Number(n) => match n.as_u64() {
                    Some(0) => false,
                    Some(1) => true,
                    _ => return Err(mismatch()),
                },
                _ => return Err(mismatch()),
            };
            out.push(if value { Felt::ONE } else { Felt::ZERO });
            return Ok(());
        }
        if ty == "core::integer::u256" {
            let value = match arg {
                JsonValue::String(text) => text.parse::<Uint256>().map_err(|_| mismatch())?,
                JsonValue::Number(n) => Uint256::from(u128::from(n.as_u64().ok_or_else(mismatch)?)),
                _ => return Err(mismatch()),
            };
            out.extend(value.to_felts());
            return Ok(());
        }
        if let Some(bits) = uint_bits(ty) {
            let value = match arg {
                JsonValue::String(text) => {
                    let felt = parse_felt(text).map_err(|_| mismatch())?;
                    felt_to_u128(&felt)
                        .map_err(|_| EncodeError::OutOfRange(text.clone(), ty.to_string()))?
                }
                JsonValue::Number(n) => u128::from(n.as_u64().ok_or_else(mismatch)?),
                _ => return Err(mismatch()),
            };
            if bits < 128 && value >> bits != 0 {
                return Err(EncodeError::OutOfRange(value.to_string(), ty.to_string()));
            }
            out.push(Felt::from(value));
            return Ok(());
        }
        if ty == BYTE_ARRAY {
            match arg {
                JsonValue::String(text) => out.extend(encode_byte_array(text)),
                _ => return Err(mismatch()),
            }
            return Ok(());
        }
        if let Some(inner) = generic_arg(ty, "core::array::Array")
            .or_else(|| generic_arg(ty, "core::array::Span"))
        {
            let items = arg.as_array().ok_or_else(mismatch)?;
            out.push(Felt::from(items.len() as u64));
            for item in items {
                self.encode(inner, item, out)?;
            }
            return Ok(());
        }
        if let Some(parts) = tuple_parts(ty) {
            let items = arg.as_array().ok_or_else(mismatch)?;
            if items.len() != parts.len() {
                return Err(mismatch());
            }
            for (part, item) in parts.iter().zip(items) {
                self.encode(part, item, out)?;
            }
            return Ok(());
        }
        if let Some(members) = self.structs.get(ty) {
            match arg {
                JsonValue::Object(fields) => {
                    for member in members {
                        let value = fields.get(&member.name).ok_or_else(|| {
                            EncodeError::MissingField(member.name.clone(), ty.to_string())
                        })?;
                        self.encode(&member.ty, value, out)?;
                    }
                }
                JsonValue::Array(items) if items.len() == members.len() => {
                    for (member, item) in members.iter().zip(items) {
                        self.encode(&member.ty, item, out)?;
                    }
                }
                _ => return Err(mismatch()),
            }
            return Ok(());
        }
        if let Some(variants) = self.enums.get(ty) {
            let (name, value) = match arg {
                JsonValue::String(name) => (name.as_str(), &UNIT_ARG),
                JsonValue::Object(map) if map.len() == 1 => match map.iter().next() {
                    Some((name, value)) => (name.as_str(), value),
                    None => return Err(mismatch()),
                },
                _ => return Err(mismatch()),
            };
            let index = variants
                .iter()
                .position(|v| v.name == name)
                .ok_or_else(|| EncodeError::UnknownVariant(name.to_string(), ty.to_string()))?;
            out.push(Felt::from(index as u64));
            return self.encode(&variants[index].ty, value, out);
        }

        Err(EncodeError::Unsupported(ty.to_string()))
    }

    /// Check calldata for a function against its declared inputs.
    pub fn check_args(&self, function: &FunctionAbi, args: &[Felt]) -> ChainResult<()> {
        self.check_members(&function.name, &function.inputs, args)
    }

    /// Check calldata for the constructor.
    pub fn check_constructor_args(&self, args: &[Felt]) -> ChainResult<()> {
        self.check_members("constructor", &self.constructor, args)
    }

    fn check_members(&self, context: &str, members: &[Member], args: &[Felt]) -> ChainResult<()> {
        let mut decoder = Decoder::new(self, args);
        for member in members {
            match decoder.decode(&member.ty) {
                Ok(_) => {}
                Err(DecodeError::Unsupported(ty)) => {
                    tracing::debug!(function = context, ty = %ty, "Skipping calldata check for opaque type");
                    return Ok(());
                }
                Err(e) => {
                    return Err(ChainError::InvalidArgument(format!(
                        "{}: argument '{}' ({}): {}",
                        context, member.name, member.ty, e
                    )))
                }
            }
        }
        if decoder.remaining() > 0 {
            return Err(ChainError::InvalidArgument(format!(
                "{}: expected {} calldata felts, got {}",
                context,
                args.len() - decoder.remaining(),
                args.len()
            )));
        }
        Ok(())
    }

    /// Decode a function's return data. Falls back to raw felts when the
    /// output types cannot be decoded.
    pub fn decode_outputs(&self, function: &FunctionAbi, data: &[Felt]) -> Value {
        let mut decoder = Decoder::new(self, data);
        let mut values = Vec::with_capacity(function.outputs.len());
        for ty in &function.outputs {
            match decoder.decode(ty) {
                Ok(value) => values.push(value),
                Err(e) => {
                    tracing::warn!(function = %function.name, error = %e, "Returning raw output");
                    return Value::Raw(data.to_vec());
                }
            }
        }
        if decoder.remaining() > 0 {
            tracing::warn!(function = %function.name, "Unexpected trailing output felts");
            return Value::Raw(data.to_vec());
        }

        match values.len() {
            0 => Value::Unit,
            1 => values.remove(0),
            _ => Value::Tuple(values),
        }
    }
}

/// A decoded Cairo value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Unit,
    Felt(Felt),
    Bool(bool),
    Uint(u128),
    U256(Uint256),
    Array(Vec<Value>),
    Tuple(Vec<Value>),
    /// Decoded `ByteArray`.
    Str(String),
    Struct {
        name: String,
        fields: Vec<(String, Value)>,
    },
    Enum {
        name: String,
        variant: String,
        value: Box<Value>,
    },
    /// Undecoded felts.
    Raw(Vec<Felt>),
}

impl Value {
    /// Named field of a struct value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct { fields, .. } => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Unit => JsonValue::Null,
            Value::Felt(f) => JsonValue::String(felt_hex(f)),
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Uint(n) => match u64::try_from(*n) {
                Ok(small) => json!(small),
                Err(_) => JsonValue::String(n.to_string()),
            },
            Value::U256(n) => JsonValue::String(n.to_string()),
            Value::Str(text) => JsonValue::String(text.clone()),
            Value::Array(items) | Value::Tuple(items) => {
                JsonValue::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Struct { fields, .. } => {
                let mut map = Map::new();
                for (name, value) in fields {
                    map.insert(name.clone(), value.to_json());
                }
                JsonValue::Object(map)
            }
            Value::Enum { variant, value, .. } => {
                let mut map = Map::new();
                map.insert(variant.clone(), value.to_json());
                JsonValue::Object(map)
            }
            Value::Raw(felts) => {
                JsonValue::Array(felts.iter().map(|f| JsonValue::String(felt_hex(f))).collect())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
enum DecodeError {
    #[error("ran out of felts")]
    Exhausted,
    #[error("value {0} out of range for {1}")]
    OutOfRange(String, String),
    #[error("unknown variant index {0} for {1}")]
    BadVariant(usize, String),
    #[error("unsupported type {0}")]
    Unsupported(String),
    #[error("array of zero-width {0} with {1} elements")]
    ZeroWidth(String, usize),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
enum EncodeError {
    #[error("expected {0}, got {1}")]
    Mismatch(String, String),
    #[error("value {0} out of range for {1}")]
    OutOfRange(String, String),
    #[error("missing field '{0}' of {1}")]
    MissingField(String, String),
    #[error("unknown variant '{0}' for {1}")]
    UnknownVariant(String, String),
    #[error("unsupported type {0}")]
    Unsupported(String),
}

/// Turn one command line argument into the value `encode_args` takes.
///
/// Text starting with `[` or `{` is read as JSON (arrays, tuples, structs,
/// enums); `true` and `false` are booleans; anything else stays text so
/// large numbers and `ByteArray` strings keep every character.
pub fn parse_arg_text(text: &str) -> ChainResult<JsonValue> {
    let trimmed = text.trim();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        return serde_json::from_str(trimmed).map_err(|e| {
            ChainError::InvalidArgument(format!("'{}' is not valid JSON: {}", trimmed, e))
        });
    }
    Ok(match trimmed {
        "true" => JsonValue::Bool(true),
        "false" => JsonValue::Bool(false),
        _ => JsonValue::String(text.to_string()),
    })
}

const BYTE_ARRAY: &str = "core::byte_array::ByteArray";
static UNIT_ARG: JsonValue = JsonValue::Null;
const BYTES_PER_WORD: usize = 31;

/// `ByteArray` calldata: full 31-byte words, then the pending word and its
/// length.
fn encode_byte_array(text: &str) -> Vec<Felt> {
    let bytes = text.as_bytes();
    let full_words = bytes.len() / BYTES_PER_WORD;
    let (full, pending) = bytes.split_at(full_words * BYTES_PER_WORD);

    let mut out = Vec::with_capacity(full_words + 3);
    out.push(Felt::from(full_words as u64));
    out.extend(full.chunks(BYTES_PER_WORD).map(word_to_felt));
    out.push(word_to_felt(pending));
    out.push(Felt::from(pending.len() as u64));
    out
}

fn word_to_felt(word: &[u8]) -> Felt {
    let mut buf = [0u8; 32];
    buf[32 - word.len()..].copy_from_slice(word);
    Felt::from_bytes_be(&buf)
}

const FELT_TYPES: &[&str] = &[
    "felt252",
    "core::felt252",
    "core::starknet::contract_address::ContractAddress",
    "core::starknet::class_hash::ClassHash",
    "core::starknet::eth_address::EthAddress",
    "core::bytes_31::bytes31",
];

struct Decoder<'a> {
    abi: &'a ContractAbi,
    felts: &'a [Felt],
    pos: usize,
}

impl<'a> Decoder<'a> {
    fn new(abi: &'a ContractAbi, felts: &'a [Felt]) -> Self {
        Self { abi, felts, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.felts.len() - self.pos
    }

    fn next(&mut self) -> Result<Felt, DecodeError> {
        let felt = *self.felts.get(self.pos).ok_or(DecodeError::Exhausted)?;
        self.pos += 1;
        Ok(felt)
    }

    fn next_uint(&mut self, ty: &str, bits: u32) -> Result<u128, DecodeError> {
        let felt = self.next()?;
        let value = felt_to_u128(&felt)
            .map_err(|_| DecodeError::OutOfRange(felt_hex(&felt), ty.to_string()))?;
        if bits < 128 && value >> bits != 0 {
            return Err(DecodeError::OutOfRange(value.to_string(), ty.to_string()));
        }
        Ok(value)
    }

    fn decode(&mut self, ty: &str) -> Result<Value, DecodeError> {
        let ty = ty.trim();

        if ty == "()" {
            return Ok(Value::Unit);
        }
        if FELT_TYPES.contains(&ty) {
            return Ok(Value::Felt(self.next()?));
        }
        if ty == "core::bool" {
            return match self.next_uint(ty, 1)? {
                0 => Ok(Value::Bool(false)),
                _ => Ok(Value::Bool(true)),
            };
        }
        if ty == "core::integer::u256" {
            let low = self.next_uint(ty, 128)?;
            let high = self.next_uint(ty, 128)?;
            return Ok(Value::U256(Uint256 { low, high }));
        }
        if ty == BYTE_ARRAY {
            let words = self.next_uint(ty, 32)? as usize;
            if words > self.remaining() {
                return Err(DecodeError::Exhausted);
            }
            let mut bytes = Vec::with_capacity(words * BYTES_PER_WORD);
            for _ in 0..words {
                bytes.extend_from_slice(&self.next()?.to_bytes_be()[1..]);
            }
            let pending = self.next()?;
            let pending_len = self.next_uint(ty, 5)? as usize;
            if pending_len >= BYTES_PER_WORD {
                return Err(DecodeError::OutOfRange(pending_len.to_string(), ty.to_string()));
            }
            bytes.extend_from_slice(&pending.to_bytes_be()[32 - pending_len..]);
            return Ok(Value::Str(String::from_utf8_lossy(&bytes).into_owned()));
        }
        if let Some(bits) = uint_bits(ty) {
            return Ok(Value::Uint(self.next_uint(ty, bits)?));
        }
        if let Some(inner) = generic_arg(ty, "core::array::Array")
            .or_else(|| generic_arg(ty, "core::array::Span"))
        {
            let len = self.next_uint(ty, 32)? as usize;
            let mut items = Vec::with_capacity(len.min(self.remaining()));
            for i in 0..len {
                let start = self.pos;
                items.push(self.decode(inner)?);
                // Elements that consume no felts would let one length felt
                // allocate without bound.
                if i == 0 && self.pos == start && len > 1 {
                    return Err(DecodeError::ZeroWidth(inner.to_string(), len));
                }
            }
            return Ok(Value::Array(items));
        }
        if let Some(parts) = tuple_parts(ty) {
            let mut items = Vec::with_capacity(parts.len());
            for part in parts {
                items.push(self.decode(part)?);
            }
            return Ok(Value::Tuple(items));
        }

        let abi = self.abi;
        if let Some(members) = abi.structs.get(ty) {
            let mut fields = Vec::with_capacity(members.len());
            for member in members {
                fields.push((member.name.clone(), self.decode(&member.ty)?));
            }
            return Ok(Value::Struct {
                name: ty.to_string(),
                fields,
            });
        }
        if let Some(variants) = abi.enums.get(ty) {
            let index = self.next_uint(ty, 64)? as usize;
            let variant = variants
                .get(index)
                .ok_or_else(|| DecodeError::BadVariant(index, ty.to_string()))?;
            let value = self.decode(&variant.ty)?;
            return Ok(Value::Enum {
                name: ty.to_string(),
                variant: variant.name.clone(),
                value: Box::new(value),
            });
        }

        Err(DecodeError::Unsupported(ty.to_string()))
    }
}

fn uint_bits(ty: &str) -> Option<u32> {
    let name = ty.strip_prefix("core::integer::")?;
    match name {
        "u8" => Some(8),
        "u16" => Some(16),
        "u32" => Some(32),
        "u64" => Some(64),
        "u128" => Some(128),
        "usize" => Some(32),
        _ => None,
    }
}

/// `core::array::Array::<core::felt252>` → `Array<felt252>`.
fn short_type(ty: &str) -> String {
    let mut out = String::with_capacity(ty.len());
    let mut path = String::new();
    for c in ty.chars() {
        if matches!(c, '<' | '>' | '(' | ')' | ',' | ' ') {
            out.push_str(last_segment(&path));
            path.clear();
            out.push(c);
        } else {
            path.push(c);
        }
    }
    out.push_str(last_segment(&path));
    out
}

fn last_segment(path: &str) -> &str {
    let trimmed = path.trim_end_matches("::");
    trimmed.rsplit("::").next().unwrap_or(trimmed)
}

/// `core::array::Array::<T>` → `T`.
fn generic_arg<'t>(ty: &'t str, base: &str) -> Option<&'t str> {
    ty.strip_prefix(base)?
        .strip_prefix("::<")?
        .strip_suffix('>')
}

/// `(A, B, C)` → `[A, B, C]`, splitting only on top-level commas.
fn tuple_parts(ty: &str) -> Option<Vec<&str>> {
    let inner = ty.strip_prefix('(')?.strip_suffix(')')?;
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '(' | '<' => depth += 1,
            ')' | '>' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(inner[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = inner[start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }
    Some(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market_abi() -> ContractAbi {
        ContractAbi::from_value(&json!([
            {
                "type": "impl",
                "name": "MarketImpl",
                "interface_name": "market::IMarket"
            },
            {
                "type": "struct",
                "name": "core::integer::u256",
                "members": [
                    { "name": "low", "type": "core::integer::u128" },
                    { "name": "high", "type": "core::integer::u128" }
                ]
            },
            {
                "type": "enum",
                "name": "market::Outcome",
                "variants": [
                    { "name": "Open", "type": "()" },
                    { "name": "Resolved", "type": "core::bool" }
                ]
            },
            {
                "type": "struct",
                "name": "market::Market",
                "members": [
                    { "name": "id", "type": "core::integer::u64" },
                    { "name": "creator", "type": "core::starknet::contract_address::ContractAddress" },
                    { "name": "pool", "type": "core::integer::u256" },
                    { "name": "outcome", "type": "market::Outcome" },
                    { "name": "odds", "type": "core::array::Array::<core::integer::u32>" }
                ]
            },
            {
                "type": "interface",
                "name": "market::IMarket",
                "items": [
                    {
                        "type": "function",
                        "name": "get_market",
                        "inputs": [{ "name": "market_id", "type": "core::integer::u64" }],
                        "outputs": [{ "type": "market::Market" }],
                        "state_mutability": "view"
                    },
                    {
                        "type": "function",
                        "name": "place_bet",
                        "inputs": [
                            { "name": "market_id", "type": "core::integer::u64" },
                            { "name": "amount", "type": "core::integer::u256" },
                            { "name": "picks", "type": "core::array::Span::<core::felt252>" }
                        ],
                        "outputs": [],
                        "state_mutability": "external"
                    },
                    {
                        "type": "function",
                        "name": "create_market",
                        "inputs": [
                            { "name": "question", "type": "core::byte_array::ByteArray" },
                            { "name": "category", "type": "core::felt252" },
                            { "name": "end_time", "type": "core::integer::u64" },
                            { "name": "liquidity", "type": "core::integer::u256" },
                            { "name": "featured", "type": "core::bool" }
                        ],
                        "outputs": [{ "type": "core::integer::u64" }],
                        "state_mutability": "external"
                    },
                    {
                        "type": "function",
                        "name": "get_question",
                        "inputs": [{ "name": "market_id", "type": "core::integer::u64" }],
                        "outputs": [{ "type": "core::byte_array::ByteArray" }],
                        "state_mutability": "view"
                    },
                    {
                        "type": "function",
                        "name": "resolve",
                        "inputs": [
                            { "name": "market_id", "type": "core::integer::u64" },
                            { "name": "outcome", "type": "market::Outcome" }
                        ],
                        "outputs": [],
                        "state_mutability": "external"
                    },
                    {
                        "type": "function",
                        "name": "opaque",
                        "inputs": [{ "name": "x", "type": "market::Unknown" }],
                        "outputs": [{ "type": "(core::felt252, core::bool)" }],
                        "state_mutability": "view"
                    }
                ]
            },
            {
                "type": "constructor",
                "name": "constructor",
                "inputs": [{ "name": "owner", "type": "core::starknet::contract_address::ContractAddress" }]
            },
            {
                "type": "event",
                "name": "market::Event",
                "kind": "enum",
                "variants": []
            }
        ]))
        .unwrap()
    }

    fn felts(values: &[u64]) -> Vec<Felt> {
        values.iter().map(|v| Felt::from(*v)).collect()
    }

    #[test]
    fn test_function_table() {
        let abi = market_abi();
        assert_eq!(
            abi.function_names(),
            vec!["create_market", "get_market", "get_question", "opaque", "place_bet", "resolve"]
        );

        let f = abi.function("get_market").unwrap();
        assert_eq!(f.mutability, Mutability::View);
        assert_eq!(f.selector, get_selector_from_name("get_market").unwrap());
        assert_eq!(abi.constructor_inputs().len(), 1);

        assert!(matches!(
            abi.function("missing"),
            Err(ChainError::UnknownFunction(_))
        ));
    }

    #[test]
    fn test_abi_as_encoded_string() {
        let text = serde_json::to_string(&json!([{
            "type": "function",
            "name": "get_count",
            "inputs": [],
            "outputs": [{ "type": "core::felt252" }],
            "state_mutability": "view"
        }]))
        .unwrap();
        let abi = ContractAbi::from_value(&JsonValue::String(text)).unwrap();
        assert!(abi.function("get_count").is_ok());
    }

    #[test]
    fn test_check_args() {
        let abi = market_abi();
        let place_bet = abi.function("place_bet").unwrap();

        // market 1, amount (5, 0), span of two picks
        assert!(abi.check_args(place_bet, &felts(&[1, 5, 0, 2, 7, 8])).is_ok());

        let short = abi.check_args(place_bet, &felts(&[1, 5, 0, 2, 7]));
        assert!(matches!(short, Err(ChainError::InvalidArgument(_))));

        let long = abi.check_args(place_bet, &felts(&[1, 5, 0, 0, 9]));
        assert!(long.unwrap_err().to_string().contains("expected 4 calldata felts, got 5"));
    }

    #[test]
    fn test_check_args_out_of_range() {
        let abi = market_abi();
        let get_market = abi.function("get_market").unwrap();
        let too_big = vec![Felt::from(u128::MAX)];
        let err = abi.check_args(get_market, &too_big).unwrap_err();
        assert!(err.to_string().contains("market_id"));
    }

    #[test]
    fn test_check_args_opaque_type_skipped() {
        let abi = market_abi();
        let opaque = abi.function("opaque").unwrap();
        assert!(abi.check_args(opaque, &felts(&[1, 2, 3])).is_ok());
    }

    #[test]
    fn test_constructor_args() {
        let abi = market_abi();
        assert!(abi.check_constructor_args(&felts(&[0x1234])).is_ok());
        assert!(abi.check_constructor_args(&[]).is_err());
    }

    #[test]
    fn test_decode_struct() {
        let abi = market_abi();
        let get_market = abi.function("get_market").unwrap();
        // id, creator, pool(low, high), outcome Resolved(true), odds [3, 4]
        let data = felts(&[0, 0xabc, 100, 0, 1, 1, 2, 3, 4]);

        let value = abi.decode_outputs(get_market, &data);
        assert_eq!(value.field("id"), Some(&Value::Uint(0)));
        assert_eq!(value.field("creator"), Some(&Value::Felt(Felt::from(0xabcu64))));
        assert_eq!(
            value.field("pool"),
            Some(&Value::U256(Uint256 { low: 100, high: 0 }))
        );
        assert_eq!(
            value.field("odds"),
            Some(&Value::Array(vec![Value::Uint(3), Value::Uint(4)]))
        );

        let json = value.to_json();
        assert_eq!(json["pool"], json!("100"));
        assert_eq!(json["outcome"], json!({ "Resolved": true }));
    }

    #[test]
    fn test_decode_falls_back_to_raw() {
        let abi = market_abi();
        let get_market = abi.function("get_market").unwrap();
        let data = felts(&[0, 1]);
        assert_eq!(abi.decode_outputs(get_market, &data), Value::Raw(data));
    }

    #[test]
    fn test_decode_tuple_output() {
        let abi = market_abi();
        let opaque = abi.function("opaque").unwrap();
        let value = abi.decode_outputs(opaque, &felts(&[9, 0]));
        assert_eq!(
            value,
            Value::Tuple(vec![Value::Felt(Felt::from(9u64)), Value::Bool(false)])
        );
    }

    fn args(texts: &[&str]) -> Vec<JsonValue> {
        texts.iter().map(|t| parse_arg_text(t).unwrap()).collect()
    }

    fn short(text: &str) -> Felt {
        starknet::core::utils::cairo_short_string_to_felt(text).unwrap()
    }

    const QUESTION: &str = "Will ETH price reach $5000 by end of 2024?";

    #[test]
    fn test_encode_create_market() {
        let abi = market_abi();
        let create = abi.function("create_market").unwrap();
        let calldata = abi
            .encode_args(
                create,
                &args(&[QUESTION, "'crypto'", "1735689600", "1000000000000000000000", "true"]),
            )
            .unwrap();

        assert_eq!(
            calldata,
            vec![
                // ByteArray: one full word, pending word, pending length
                Felt::ONE,
                short("Will ETH price reach $5000 by e"),
                short("nd of 2024?"),
                Felt::from(11u64),
                short("crypto"),
                Felt::from(1_735_689_600u64),
                Felt::from(1_000_000_000_000_000_000_000u128),
                Felt::ZERO,
                Felt::ONE,
            ]
        );
        assert!(abi.check_args(create, &calldata).is_ok());
    }

    #[test]
    fn test_encode_u256_above_128_bits() {
        let abi = market_abi();
        let place_bet = abi.function("place_bet").unwrap();
        let calldata = abi
            .encode_args(
                place_bet,
                &args(&["1", "340282366920938463463374607431768211457", "[7, \"0x8\"]"]),
            )
            .unwrap();
        assert_eq!(calldata, felts(&[1, 1, 1, 2, 7, 8]));
    }

    #[test]
    fn test_encode_enum_variants() {
        let abi = market_abi();
        let resolve = abi.function("resolve").unwrap();
        assert_eq!(
            abi.encode_args(resolve, &args(&["3", "{\"Resolved\": true}"])).unwrap(),
            felts(&[3, 1, 1])
        );
        assert_eq!(
            abi.encode_args(resolve, &args(&["3", "Open"])).unwrap(),
            felts(&[3, 0])
        );
        let err = abi.encode_args(resolve, &args(&["3", "Cancelled"])).unwrap_err();
        assert!(err.to_string().contains("unknown variant 'Cancelled'"));
    }

    #[test]
    fn test_encode_rejects_bad_values() {
        let abi = market_abi();
        let create = abi.function("create_market").unwrap();

        let err = abi.encode_args(create, &args(&[QUESTION])).unwrap_err();
        assert!(err.to_string().contains("expected 5 arguments, got 1"));

        let err = abi
            .encode_args(create, &args(&[QUESTION, "0x1", "1", "1", "maybe"]))
            .unwrap_err();
        assert!(err.to_string().contains("featured"));

        let get_market = abi.function("get_market").unwrap();
        let err = abi
            .encode_args(get_market, &args(&["18446744073709551616"]))
            .unwrap_err();
        assert!(matches!(err, ChainError::InvalidArgument(_)));
    }

    #[test]
    fn test_decode_byte_array() {
        let abi = market_abi();
        let get_question = abi.function("get_question").unwrap();
        let data = encode_byte_array(QUESTION);
        assert_eq!(
            abi.decode_outputs(get_question, &data),
            Value::Str(QUESTION.to_string())
        );
    }

    #[test]
    fn test_zero_width_array_rejected() {
        let abi = market_abi();
        let data = [Felt::from(20_000_000u64)];
        let mut decoder = Decoder::new(&abi, &data);
        assert!(matches!(
            decoder.decode("core::array::Array::<()>"),
            Err(DecodeError::ZeroWidth(_, 20_000_000))
        ));

        let data = [Felt::ONE];
        let mut decoder = Decoder::new(&abi, &data);
        assert_eq!(
            decoder.decode("core::array::Array::<()>").unwrap(),
            Value::Array(vec![Value::Unit])
        );
    }

    #[test]
    fn test_signature() {
        let abi = market_abi();
        assert_eq!(
            abi.function("get_market").unwrap().signature(),
            "get_market(market_id: u64) -> Market"
        );
        assert_eq!(
            abi.function("place_bet").unwrap().signature(),
            "place_bet(market_id: u64, amount: u256, picks: Span<felt252>)"
        );
        let names: Vec<&str> = abi.functions().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, abi.function_names());
    }

    #[test]
    fn test_parse_arg_text() {
        assert_eq!(parse_arg_text("true").unwrap(), JsonValue::Bool(true));
        assert_eq!(parse_arg_text("[1, 2]").unwrap(), json!([1, 2]));
        assert_eq!(parse_arg_text(" 12 ").unwrap(), json!(" 12 "));
        assert!(parse_arg_text("{oops").is_err());
    }

    #[test]
    fn test_tuple_parts() {
        assert_eq!(
            tuple_parts("(core::felt252, (core::bool, core::integer::u8))").unwrap(),
            vec!["core::felt252", "(core::bool, core::integer::u8)"]
        );
        assert!(tuple_parts("core::felt252").is_none());
    }
}
