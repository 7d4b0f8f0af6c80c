use super::{Op, OpKind};
use crate::context::EvalContext;
use crate::error::Result;
use crate::lang_bail;
use crate::memory::Space;
use crate::value::{cast, Value};
use lz_core::ast::Type;
use lz_core::error::ErrorCode;
use lz_core::trace;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum ItemOp {
    Value(Op),
    Splat(Op),
}

impl ItemOp {
    fn op(&self) -> &Op {
        match self {
            ItemOp::Value(op) | ItemOp::Splat(op) => op,
        }
    }
}

fn splat_list(value: Value, into: &mut Vec<Value>) -> Result<()> {
    match value {
        Value::Nil => Ok(()),
        Value::List(list) => {
            into.extend(list.iter().cloned());
            Ok(())
        }
        other => lang_bail!(
            ErrorCode::CastError,
            "Cannot splat {} into a list",
            other.value_type()
        ),
    }
}

fn splat_dict(value: Value, into: &mut BTreeMap<String, Value>) -> Result<()> {
    match value {
        Value::Nil => Ok(()),
        Value::Dict(dict) => {
            into.extend(dict.iter().map(|(key, value)| (key.clone(), value.clone())));
            Ok(())
        }
        other => lang_bail!(
            ErrorCode::CastError,
            "Cannot splat {} into a dict",
            other.value_type()
        ),
    }
}

#[derive(Debug, Clone)]
pub struct ListOp {
    pub items: Vec<ItemOp>,
}

impl ListOp {
    pub fn is_constant(&self) -> bool {
        self.items.iter().all(|item| item.op().is_constant())
    }

    pub fn eval(&self, space: &Arc<Space>, ctx: &mut EvalContext) -> Result<Value> {
        let mut values = Vec::with_capacity(self.items.len());
        for item in &self.items {
            match item {
                ItemOp::Value(op) => values.push(op.eval(space, ctx)?),
                ItemOp::Splat(op) => splat_list(op.eval(space, ctx)?, &mut values)?,
            }
        }
        Ok(Value::list(values))
    }

    /// Collapses runs of constant items, splats included, into precomputed segments.
    pub fn specialize(self) -> OpKind {
        if !self.items.iter().any(|item| item.op().constant_value().is_some()) {
            return OpKind::List(self);
        }

        let mut segments = Vec::new();
        let mut run = Vec::new();
        let mut dynamic = 0;
        for item in self.items {
            let constant = match &item {
                ItemOp::Value(op) => op.constant_value().map(|value| {
                    run.push(value.clone());
                }),
                ItemOp::Splat(op) => op
                    .constant_value()
                    .and_then(|value| splat_list(value.clone(), &mut run).ok()),
            };
            if constant.is_none() {
                if !run.is_empty() {
                    segments.push(ListSegment::Constant(std::mem::take(&mut run)));
                }
                dynamic += 1;
                segments.push(match item {
                    ItemOp::Value(op) => ListSegment::Value(op),
                    ItemOp::Splat(op) => ListSegment::Splat(op),
                });
            }
        }
        if !run.is_empty() {
            segments.push(ListSegment::Constant(run));
        }
        trace!(
            "patched list of {} segments, {} dynamic",
            segments.len(),
            dynamic
        );
        OpKind::PatchedList(PatchedListOp { segments })
    }
}

#[derive(Debug, Clone)]
pub enum ListSegment {
    /// Elements laid out at specialization time.
    Constant(Vec<Value>),
    Value(Op),
    Splat(Op),
}

/// A list whose constant runs are computed once; evaluation fills in the rest in order.
#[derive(Debug, Clone)]
pub struct PatchedListOp {
    pub segments: Vec<ListSegment>,
}

impl PatchedListOp {
    pub fn is_constant(&self) -> bool {
        self.segments
            .iter()
            .all(|segment| matches!(segment, ListSegment::Constant(_)))
    }

    pub fn eval(&self, space: &Arc<Space>, ctx: &mut EvalContext) -> Result<Value> {
        let mut values = Vec::new();
        for segment in &self.segments {
            match segment {
                ListSegment::Constant(run) => values.extend(run.iter().cloned()),
                ListSegment::Value(op) => values.push(op.eval(space, ctx)?),
                ListSegment::Splat(op) => splat_list(op.eval(space, ctx)?, &mut values)?,
            }
        }
        Ok(Value::list(values))
    }
}

#[derive(Debug, Clone)]
pub enum EntryOp {
    Pair { key: Op, value: Op },
    Splat(Op),
}

fn dict_key(key: Value) -> Result<String> {
    match key {
        Value::Nil => lang_bail!(ErrorCode::NilError, "dict key cannot be nil"),
        Value::String(s) => Ok(s.to_string()),
        other => match cast(other, Type::String)? {
            Value::String(s) => Ok(s.to_string()),
            _ => lang_bail!(ErrorCode::NilError, "dict key cannot be nil"),
        },
    }
}

#[derive(Debug, Clone)]
pub struct DictOp {
    pub entries: Vec<EntryOp>,
}

impl DictOp {
    pub fn is_constant(&self) -> bool {
        self.entries.iter().all(|entry| match entry {
            EntryOp::Pair { key, value } => key.is_constant() && value.is_constant(),
            EntryOp::Splat(op) => op.is_constant(),
        })
    }

    pub fn eval(&self, space: &Arc<Space>, ctx: &mut EvalContext) -> Result<Value> {
        let mut dict = BTreeMap::new();
        for entry in &self.entries {
            match entry {
                EntryOp::Pair { key, value } => {
                    let key = dict_key(key.eval(space, ctx)?)?;
                    let value = value.eval(space, ctx)?;
                    dict.insert(key, value);
                }
                EntryOp::Splat(op) => splat_dict(op.eval(space, ctx)?, &mut dict)?,
            }
        }
        Ok(Value::Dict(Arc::new(dict)))
    }

    /// Merges runs of constant entries into precomputed maps. Entries are still applied in
    /// source order, so later keys and splats override earlier ones.
    pub fn specialize(self) -> OpKind {
        let has_constant = self.entries.iter().any(|entry| match entry {
            EntryOp::Pair { key, .. } => key.constant_value().is_some(),
            EntryOp::Splat(op) => op.constant_value().is_some(),
        });
        if !has_constant {
            return OpKind::Dict(self);
        }

        let mut segments = Vec::new();
        let mut run = BTreeMap::new();
        let mut in_run = false;
        let mut dynamic = 0;
        for entry in self.entries {
            let merged = match &entry {
                EntryOp::Pair { key, value } => key
                    .constant_value()
                    .and_then(|key| dict_key(key.clone()).ok())
                    .zip(value.constant_value())
                    .map(|(key, value)| {
                        run.insert(key, value.clone());
                    }),
                EntryOp::Splat(op) => op
                    .constant_value()
                    .and_then(|value| splat_dict(value.clone(), &mut run).ok()),
            };
            if merged.is_some() {
                in_run = true;
                continue;
            }
            if in_run {
                segments.push(DictSegment::Constant(std::mem::take(&mut run)));
                in_run = false;
            }
            dynamic += 1;
            segments.push(match entry {
                EntryOp::Pair { key, value } => match key
                    .constant_value()
                    .and_then(|key| dict_key(key.clone()).ok())
                {
                    Some(key) => DictSegment::Pair { key, value },
                    None => DictSegment::DynamicPair { key, value },
                },
                EntryOp::Splat(op) => DictSegment::Splat(op),
            });
        }
        if in_run {
            segments.push(DictSegment::Constant(run));
        }
        trace!(
            "merged dict of {} segments, {} dynamic",
            segments.len(),
            dynamic
        );
        OpKind::MergedDict(MergedDictOp { segments })
    }
}

#[derive(Debug, Clone)]
pub enum DictSegment {
    /// Entries merged at specialization time.
    Constant(BTreeMap<String, Value>),
    /// Constant key, converted once.
    Pair { key: String, value: Op },
    DynamicPair { key: Op, value: Op },
    Splat(Op),
}

/// A dict whose constant entries are merged once; evaluation applies the rest in order.
#[derive(Debug, Clone)]
pub struct MergedDictOp {
    pub segments: Vec<DictSegment>,
}

impl MergedDictOp {
    pub fn is_constant(&self) -> bool {
        self.segments
            .iter()
            .all(|segment| matches!(segment, DictSegment::Constant(_)))
    }

    pub fn eval(&self, space: &Arc<Space>, ctx: &mut EvalContext) -> Result<Value> {
        let mut segments = self.segments.iter();
        let mut dict = match self.segments.first() {
            Some(DictSegment::Constant(first)) => {
                segments.next();
                first.clone()
            }
            _ => BTreeMap::new(),
        };
        for segment in segments {
            match segment {
                DictSegment::Constant(run) => {
                    dict.extend(run.iter().map(|(key, value)| (key.clone(), value.clone())))
                }
                DictSegment::Pair { key, value } => {
                    let value = value.eval(space, ctx)?;
                    dict.insert(key.clone(), value);
                }
                DictSegment::DynamicPair { key, value } => {
                    let key = dict_key(key.eval(space, ctx)?)?;
                    let value = value.eval(space, ctx)?;
                    dict.insert(key, value);
                }
                DictSegment::Splat(op) => splat_dict(op.eval(space, ctx)?, &mut dict)?,
            }
        }
        Ok(Value::Dict(Arc::new(dict)))
    }
}

/// One navigation step. Nil keys and missing entries end the walk with nil.
fn step(current: &Value, key: &Value) -> Result<Value> {
    match current {
        Value::Dict(dict) => match cast(key.clone(), Type::String)? {
            Value::String(key) => Ok(dict.get(key.as_ref()).cloned().unwrap_or_default()),
            _ => Ok(Value::Nil),
        },
        Value::List(list) => match cast(key.clone(), Type::Long)? {
            Value::Long(index) => Ok(usize::try_from(index)
                .ok()
                .and_then(|index| list.get(index))
                .cloned()
                .unwrap_or_default()),
            _ => Ok(Value::Nil),
        },
        Value::Nil => Ok(Value::Nil),
        other => lang_bail!(
            ErrorCode::CastError,
            "container access not defined for type {}",
            other.value_type()
        ),
    }
}

#[derive(Debug, Clone)]
pub struct AccessOp {
    pub container: Box<Op>,
    pub keys: Vec<Op>,
}

impl AccessOp {
    pub fn eval(&self, space: &Arc<Space>, ctx: &mut EvalContext) -> Result<Value> {
        let mut current = self.container.eval(space, ctx)?;
        let mut keys = Vec::with_capacity(self.keys.len());
        for key in &self.keys {
            keys.push(key.eval(space, ctx)?);
        }
        for key in &keys {
            if current.is_nil() {
                break;
            }
            current = step(&current, key)?;
        }
        Ok(current)
    }

    pub fn specialize(self) -> OpKind {
        match self.keys.as_slice() {
            [key] if key.constant_value().is_some() => {
                let key = key.constant_value().cloned().unwrap_or_default();
                OpKind::ConstantKeyAccess(ConstantKeyAccessOp {
                    container: self.container,
                    key,
                })
            }
            _ => OpKind::Access(self),
        }
    }
}

/// Single-step access through a key known at build time.
#[derive(Debug, Clone)]
pub struct ConstantKeyAccessOp {
    pub container: Box<Op>,
    pub key: Value,
}

impl ConstantKeyAccessOp {
    pub fn eval(&self, space: &Arc<Space>, ctx: &mut EvalContext) -> Result<Value> {
        let container = self.container.eval(space, ctx)?;
        match (&container, &self.key) {
            (Value::Dict(dict), Value::String(key)) => {
                Ok(dict.get(key.as_ref()).cloned().unwrap_or_default())
            }
            _ => step(&container, &self.key),
        }
    }
}
