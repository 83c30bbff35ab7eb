//! Two-phase schema registry.
//!
//! `SchemaBuilder` collects named declarations in any order. `build` then
//! declares every name, memoizes wire names, binds each `Ref` to a table slot,
//! rejects infinite types and validates layouts. The resulting
//! [`SchemaRegistry`] is immutable, `Send + Sync` and shared by reference.

use hashbrown::{HashMap, HashSet};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::binary::BinaryCodec;
use crate::case::CaseStyle;
use crate::config::CodecConfig;
use crate::error::{CodecError, CodecResult, ErrorKind, SchemaError};
use crate::json::JsonCodec;
use crate::schema::{
    BitGroupSpec, BitMemberKind, BytesMode, Derivation, EnumSpec, FieldRole, FieldSpec, Framing,
    LengthPrefix, Presence, Primitive, RecordSpec, Termination, TypeCodec, TypeId, VariantSpec,
    ZeroSize,
};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeDef {
    pub name: String,
    pub codec: TypeCodec,
}

#[derive(Debug, Default)]
pub struct SchemaBuilder {
    defs: Vec<TypeDef>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, codec: TypeCodec) -> &mut Self {
        self.defs.push(TypeDef {
            name: name.into(),
            codec,
        });
        self
    }

    pub fn record(&mut self, spec: RecordSpec) -> &mut Self {
        let name = spec.name.clone();
        self.register(name, TypeCodec::Record(spec))
    }

    pub fn variant(&mut self, spec: VariantSpec) -> &mut Self {
        let name = spec.name.clone();
        self.register(name, TypeCodec::Variant(spec))
    }

    pub fn enumeration(&mut self, spec: EnumSpec) -> &mut Self {
        let name = spec.name.clone();
        self.register(name, TypeCodec::Enum(spec))
    }

    pub fn bit_group(&mut self, spec: BitGroupSpec) -> &mut Self {
        let name = spec.name.clone();
        self.register(name, TypeCodec::BitGroup(spec))
    }

    /// Another name for an existing type.
    pub fn alias(&mut self, name: impl Into<String>, target: &str) -> &mut Self {
        self.register(name, TypeCodec::reference(target))
    }

    pub fn build(self) -> Result<SchemaRegistry, SchemaError> {
        let mut defs = self.defs;

        let mut index = HashMap::with_capacity(defs.len());
        for (i, def) in defs.iter().enumerate() {
            if index.insert(def.name.clone(), TypeId(i)).is_some() {
                return Err(SchemaError::DuplicateName {
                    name: def.name.clone(),
                });
            }
        }

        for def in defs.iter_mut() {
            let from = def.name.clone();
            walk_mut(&mut def.codec, &mut |codec: &mut TypeCodec| {
                memoize_names(codec);
                bind_refs(codec, &index, &from)
            })?;
        }

        let registry = SchemaRegistry { defs, index };
        registry.check_finite()?;
        for def in &registry.defs {
            registry.validate(&def.name, &def.codec)?;
        }
        registry.check_slots()?;
        log::debug!("schema registry built with {} types", registry.defs.len());
        Ok(registry)
    }
}

fn walk_mut<F>(codec: &mut TypeCodec, f: &mut F) -> Result<(), SchemaError>
where
    F: FnMut(&mut TypeCodec) -> Result<(), SchemaError>,
{
    f(codec)?;
    match codec {
        TypeCodec::Literal(lit) => walk_mut(&mut lit.codec, f),
        TypeCodec::Array(arr) => walk_mut(&mut arr.item, f),
        TypeCodec::Record(rec) => rec
            .fields
            .iter_mut()
            .try_for_each(|field| walk_mut(&mut field.codec, f)),
        TypeCodec::Variant(var) => walk_mut(&mut var.discriminant_codec, f),
        TypeCodec::Switch(switch) => switch
            .cases
            .iter_mut()
            .try_for_each(|(_, case)| walk_mut(case, f)),
        TypeCodec::Primitive(_)
        | TypeCodec::Enum(_)
        | TypeCodec::BitGroup(_)
        | TypeCodec::Ref(_)
        | TypeCodec::SlotBits(_) => Ok(()),
    }
}

fn memoize_names(codec: &mut TypeCodec) {
    match codec {
        TypeCodec::Record(rec) => {
            let style = rec.case_style;
            for field in rec.fields.iter_mut() {
                field.wire_name = match &field.rename {
                    Some(name) => name.clone(),
                    None => style.rename(&field.name),
                };
            }
        }
        TypeCodec::Enum(spec) => {
            let style = spec.case_style;
            for variant in spec.variants.iter_mut() {
                variant.wire_label = style.rename(&variant.label);
            }
        }
        TypeCodec::BitGroup(group) => {
            for member in group.members.iter_mut() {
                member.wire_name = CaseStyle::SnakeCase.rename(&member.name);
            }
        }
        _ => {}
    }
}

fn bind_refs(
    codec: &mut TypeCodec,
    index: &HashMap<String, TypeId>,
    from: &str,
) -> Result<(), SchemaError> {
    let bind = |r: &mut crate::schema::TypeRef| match index.get(&r.name) {
        Some(id) => {
            r.id = Some(*id);
            Ok(())
        }
        None => Err(SchemaError::UnresolvedReference {
            from: from.to_string(),
            name: r.name.clone(),
        }),
    };
    match codec {
        TypeCodec::Ref(r) => bind(r),
        TypeCodec::Variant(var) => var.cases.iter_mut().try_for_each(|c| bind(&mut c.record)),
        _ => Ok(()),
    }
}

/// The built, read-only registry.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    defs: Vec<TypeDef>,
    index: HashMap<String, TypeId>,
}

impl SchemaRegistry {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Registered names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.defs.iter().map(|d| d.name.as_str())
    }

    pub fn id_of(&self, name: &str) -> Option<TypeId> {
        self.index.get(name).copied()
    }

    pub fn get(&self, id: TypeId) -> Option<&TypeDef> {
        self.defs.get(id.0)
    }

    /// Declared codec for `name`.
    pub fn resolve(&self, name: &str) -> Option<&TypeCodec> {
        self.id_of(name).and_then(|id| self.get(id)).map(|d| &d.codec)
    }

    pub(crate) fn lookup(&self, name: &str) -> CodecResult<&TypeDef> {
        self.id_of(name)
            .and_then(|id| self.get(id))
            .ok_or_else(|| {
                ErrorKind::UnknownType {
                    name: name.to_string(),
                }
                .into()
            })
    }

    /// Follow `Ref` chains to a concrete codec.
    pub(crate) fn deref<'a>(&'a self, mut codec: &'a TypeCodec) -> CodecResult<&'a TypeCodec> {
        for _ in 0..=self.defs.len() {
            match codec {
                TypeCodec::Ref(r) => {
                    codec = match r.id.and_then(|id| self.get(id)) {
                        Some(def) => &def.codec,
                        None => &self.lookup(&r.name)?.codec,
                    };
                }
                other => return Ok(other),
            }
        }
        Err(CodecError::invalid("reference chain does not terminate"))
    }

    pub(crate) fn record_of(&self, name: &str) -> CodecResult<&RecordSpec> {
        match &self.lookup(name)?.codec {
            TypeCodec::Record(rec) => Ok(rec),
            other => Err(CodecError::mismatch("record", other.describe())),
        }
    }

    /// Logical keys a flattened record or bit group contributes to its parent.
    pub(crate) fn flattened_keys<'a>(&'a self, codec: &'a TypeCodec) -> CodecResult<Vec<&'a str>> {
        match self.deref(codec)? {
            TypeCodec::BitGroup(group) => Ok(group.members.iter().map(|m| m.name.as_str()).collect()),
            TypeCodec::Record(rec) => self.value_keys(rec),
            other => Err(CodecError::mismatch("record or bit group", other.describe())),
        }
    }

    /// Logical keys of a record's value, with flattened members expanded.
    pub(crate) fn value_keys<'a>(&'a self, rec: &'a RecordSpec) -> CodecResult<Vec<&'a str>> {
        let mut keys = Vec::new();
        for field in rec.fields.iter().filter(|f| f.is_value()) {
            if field.flatten {
                keys.extend(self.flattened_keys(&field.codec)?);
            } else {
                keys.push(field.name.as_str());
            }
        }
        Ok(keys)
    }

    pub fn binary(&self) -> BinaryCodec<'_> {
        BinaryCodec::new(self, CodecConfig::default())
    }

    pub fn binary_with(&self, config: CodecConfig) -> BinaryCodec<'_> {
        BinaryCodec::new(self, config)
    }

    pub fn json(&self) -> JsonCodec<'_> {
        JsonCodec::new(self, CodecConfig::default())
    }

    pub fn json_with(&self, config: CodecConfig) -> JsonCodec<'_> {
        JsonCodec::new(self, config)
    }

    pub fn decode(&self, bytes: &[u8], name: &str) -> CodecResult<Value> {
        self.binary().decode(bytes, name)
    }

    pub fn encode(&self, value: &Value, name: &str) -> CodecResult<Vec<u8>> {
        self.binary().encode(value, name)
    }

    pub fn decode_json(&self, doc: &serde_json::Value, name: &str) -> CodecResult<Value> {
        self.json().decode(doc, name)
    }

    pub fn encode_json(&self, value: &Value, name: &str) -> CodecResult<serde_json::Value> {
        self.json().encode(value, name)
    }

    fn check_finite(&self) -> Result<(), SchemaError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Active,
            Done,
        }

        fn edges(codec: &TypeCodec, out: &mut Vec<TypeId>) {
            match codec {
                TypeCodec::Ref(r) => out.extend(r.id),
                TypeCodec::Literal(lit) => edges(&lit.codec, out),
                TypeCodec::Array(arr) if arr.min_len > 0 => edges(&arr.item, out),
                TypeCodec::Record(rec) => rec
                    .fields
                    .iter()
                    .filter(|f| !f.presence.is_optional())
                    .for_each(|f| edges(&f.codec, out)),
                TypeCodec::Switch(switch) => switch.cases.iter().for_each(|(_, c)| edges(c, out)),
                _ => {}
            }
        }

        fn visit(
            reg: &SchemaRegistry,
            id: TypeId,
            marks: &mut [Mark],
            stack: &mut Vec<TypeId>,
        ) -> Result<(), SchemaError> {
            match marks[id.0] {
                Mark::Done => return Ok(()),
                Mark::Active => {
                    let start = stack.iter().position(|s| *s == id).unwrap_or(0);
                    let cycle = stack[start..]
                        .iter()
                        .chain(std::iter::once(&id))
                        .map(|s| reg.defs[s.0].name.as_str())
                        .collect::<Vec<_>>()
                        .join(" -> ");
                    return Err(SchemaError::InfiniteType {
                        name: reg.defs[id.0].name.clone(),
                        cycle,
                    });
                }
                Mark::New => {}
            }
            marks[id.0] = Mark::Active;
            stack.push(id);
            let mut next = Vec::new();
            edges(&reg.defs[id.0].codec, &mut next);
            for target in next {
                visit(reg, target, marks, stack)?;
            }
            stack.pop();
            marks[id.0] = Mark::Done;
            Ok(())
        }

        let mut marks = vec![Mark::New; self.defs.len()];
        let mut stack = Vec::new();
        for i in 0..self.defs.len() {
            visit(self, TypeId(i), &mut marks, &mut stack)?;
        }
        Ok(())
    }

    fn validate(&self, owner: &str, codec: &TypeCodec) -> Result<(), SchemaError> {
        let layout = |reason: String| SchemaError::InvalidLayout {
            name: owner.to_string(),
            reason,
        };
        match codec {
            TypeCodec::Primitive(p) => check_primitive(p).map_err(layout),
            TypeCodec::Literal(lit) => self.validate(owner, &lit.codec),
            TypeCodec::Enum(spec) => check_enum(spec).map_err(layout),
            TypeCodec::BitGroup(group) => check_bit_group(group).map_err(layout),
            TypeCodec::Array(arr) => {
                if let Some(max) = arr.max_len {
                    if arr.min_len > max {
                        return Err(layout(format!(
                            "array bounds [{}, {max}] are empty",
                            arr.min_len
                        )));
                    }
                }
                match &arr.termination {
                    Termination::LengthPrefix(prefix) => check_prefix(prefix).map_err(layout)?,
                    Termination::Terminator { width, value, .. } => {
                        if !(1..=32).contains(width)
                            || (*width < 32 && u64::from(*value) >= 1u64 << width)
                        {
                            return Err(layout(format!(
                                "terminator {value} does not fit {width} bits"
                            )));
                        }
                    }
                    Termination::Slots(slots) if slots.is_empty() => {
                        return Err(layout("count from an empty slot list".to_string()));
                    }
                    Termination::Count(_)
                    | Termination::Remaining
                    | Termination::Slots(_)
                    | Termination::OffsetTable(_) => {}
                }
                self.validate(owner, &arr.item)
            }
            TypeCodec::Record(rec) => self.validate_record(rec),
            TypeCodec::Variant(var) => self.validate_variant(var),
            TypeCodec::Ref(_) | TypeCodec::SlotBits(_) => Ok(()),
            TypeCodec::Switch(switch) => {
                if switch.cases.is_empty() {
                    return Err(layout(format!("switch on `{}` has no cases", switch.slot)));
                }
                for (i, (when, case)) in switch.cases.iter().enumerate() {
                    if switch.cases[..i].iter().any(|(w, _)| w == when) {
                        return Err(layout(format!("switch case {when} is declared twice")));
                    }
                    self.validate(owner, case)?;
                }
                Ok(())
            }
        }
    }

    /// Every slot read somewhere must be set by some field.
    fn check_slots(&self) -> Result<(), SchemaError> {
        fn collect<'a>(
            codec: &'a TypeCodec,
            owner: &'a str,
            defined: &mut HashSet<&'a str>,
            used: &mut Vec<(&'a str, &'a str)>,
        ) {
            match codec {
                TypeCodec::Literal(lit) => collect(&lit.codec, owner, defined, used),
                TypeCodec::Array(arr) => {
                    match &arr.termination {
                        Termination::Slots(slots) => {
                            used.extend(slots.iter().map(|s| (owner, s.as_str())));
                        }
                        Termination::OffsetTable(table) => used.extend(
                            table
                                .count
                                .iter()
                                .chain(table.wide.iter())
                                .map(|s| (owner, s.as_str())),
                        ),
                        _ => {}
                    }
                    collect(&arr.item, owner, defined, used);
                }
                TypeCodec::Record(rec) => {
                    for field in &rec.fields {
                        if let Some(slot) = &field.slot {
                            defined.insert(slot.as_str());
                        }
                        collect(&field.codec, &rec.name, defined, used);
                    }
                }
                TypeCodec::SlotBits(bits) => used.push((owner, bits.slot.as_str())),
                TypeCodec::Switch(switch) => {
                    used.push((owner, switch.slot.as_str()));
                    for (_, case) in &switch.cases {
                        collect(case, owner, defined, used);
                    }
                }
                _ => {}
            }
        }

        let mut defined = HashSet::new();
        let mut used = Vec::new();
        for def in &self.defs {
            collect(&def.codec, &def.name, &mut defined, &mut used);
        }
        match used.into_iter().find(|(_, slot)| !defined.contains(slot)) {
            Some((owner, slot)) => Err(SchemaError::InvalidLayout {
                name: owner.to_string(),
                reason: format!("slot `{slot}` is read but no field sets it"),
            }),
            None => Ok(()),
        }
    }

    fn validate_record<'r>(&'r self, rec: &'r RecordSpec) -> Result<(), SchemaError> {
        let layout = |reason: String| SchemaError::InvalidLayout {
            name: rec.name.clone(),
            reason,
        };
        let resolved = |field: &'r FieldSpec| {
            self.deref(&field.codec)
                .map_err(|e| layout(format!("field `{}`: {e}", field.name)))
        };

        let mut seen: HashSet<&str> = HashSet::new();
        for (i, field) in rec.fields.iter().enumerate() {
            if !seen.insert(field.name.as_str()) {
                return Err(layout(format!("duplicate field `{}`", field.name)));
            }
            let earlier = &rec.fields[..i];
            let later = &rec.fields[i + 1..];
            let codec = resolved(field)?;

            match &field.role {
                FieldRole::Hidden => {
                    if !matches!(codec, TypeCodec::Literal(_)) || field.presence.is_optional() {
                        return Err(layout(format!(
                            "hidden field `{}` must be a required literal",
                            field.name
                        )));
                    }
                }
                FieldRole::PresenceHeader { width } => {
                    if !(1..=32).contains(width) || field.presence.is_optional() || field.flatten {
                        return Err(layout(format!(
                            "presence header `{}` must be a required 1..=32 bit field",
                            field.name
                        )));
                    }
                }
                FieldRole::Implied => {
                    if field.default.is_none() || field.presence.is_optional() || field.flatten {
                        return Err(layout(format!(
                            "implied field `{}` must be a required, unflattened field with a value",
                            field.name
                        )));
                    }
                }
                FieldRole::Derived(rule) => {
                    self.check_derived(rec, i, field, rule, codec).map_err(layout)?;
                }
                FieldRole::Size(spec) => {
                    let run = rec.size_run(i, spec).filter(|_| {
                        !spec.int.is_signed() && !field.presence.is_optional() && !field.flatten
                    });
                    let Some((_, end)) = run else {
                        return Err(layout(format!(
                            "size `{}` must be a required unsigned field before the run it measures",
                            field.name
                        )));
                    };
                    if rec.fields[i + 1..end]
                        .iter()
                        .any(|f| matches!(f.role, FieldRole::Size(_)))
                    {
                        return Err(layout(format!("size `{}` measures another size", field.name)));
                    }
                    if let ZeroSize::WhenEmpty(name) = &spec.zero {
                        if rec.get(name).is_none() {
                            return Err(layout(format!(
                                "size `{}` is zero for the unknown field `{name}`",
                                field.name
                            )));
                        }
                    }
                }
                FieldRole::Value => {}
            }

            if field.slot.is_some()
                && matches!(field.role, FieldRole::Value | FieldRole::Hidden)
                && !publishes_int(self, codec)
            {
                return Err(layout(format!(
                    "field `{}` publishes {}, which is not an integer or boolean",
                    field.name,
                    codec.describe()
                )));
            }

            if field.default.is_some()
                && field.role != FieldRole::Implied
                && !matches!(
                    field.presence,
                    Presence::LeadingBit | Presence::HeaderBit { .. } | Presence::Remaining
                )
            {
                return Err(layout(format!(
                    "field `{}` declares a default without a leading-bit, header-bit or remaining presence",
                    field.name
                )));
            }

            match &field.presence {
                Presence::HeaderBit { header, bit } => {
                    check_header(earlier, header, *bit).map_err(|r| {
                        layout(format!("field `{}`: {r}", field.name))
                    })?;
                }
                Presence::HeaderAny { header, mask } => {
                    let width = match earlier.iter().find(|f| f.name == *header).map(|f| &f.role) {
                        Some(FieldRole::PresenceHeader { width }) => *width,
                        _ => {
                            return Err(layout(format!(
                                "field `{}`: `{header}` is not an earlier presence header",
                                field.name
                            )))
                        }
                    };
                    if *mask == 0 || u64::from(*mask) >= 1u64 << width {
                        return Err(layout(format!(
                            "field `{}`: mask {mask:#x} does not fit the {width}-bit header `{header}`",
                            field.name
                        )));
                    }
                }
                Presence::WhenTrue(path) | Presence::WhenEquals { path, .. } => {
                    let first = path.split('.').next().unwrap_or_default();
                    let known = earlier.iter().filter(|f| f.is_value()).any(|f| {
                        f.name == first
                            || (f.flatten
                                && self
                                    .flattened_keys(&f.codec)
                                    .is_ok_and(|keys| keys.contains(&first)))
                    });
                    if !known {
                        return Err(layout(format!(
                            "field `{}` depends on `{path}`, which is not an earlier field",
                            field.name
                        )));
                    }
                }
                Presence::Remaining => {
                    if later.iter().any(|f| f.presence != Presence::Remaining) {
                        return Err(layout(format!(
                            "field `{}` is present-if-remaining but not trailing",
                            field.name
                        )));
                    }
                }
                Presence::Required | Presence::LeadingBit | Presence::Sentinel(_) => {}
            }

            // a measured run bounds whatever reads to its end
            let ends_run = rec.fields[..i].iter().enumerate().any(|(j, f)| {
                matches!(&f.role, FieldRole::Size(spec)
                    if rec.size_run(j, spec).is_some_and(|(_, end)| end == i + 1))
            });
            if consumes_rest(self, codec) && !later.is_empty() && !ends_run {
                return Err(layout(format!(
                    "field `{}` consumes the rest of the body but is not last",
                    field.name
                )));
            }

            match codec {
                TypeCodec::BitGroup(group) => {
                    for member in &group.members {
                        if let Presence::HeaderBit { header, bit } = &member.presence {
                            if !field.flatten {
                                return Err(layout(format!(
                                    "bit group `{}` uses header bits and must be flattened",
                                    group.name
                                )));
                            }
                            check_header(earlier, header, *bit).map_err(|r| {
                                layout(format!("member `{}`: {r}", member.name))
                            })?;
                        }
                    }
                }
                TypeCodec::Record(_) => {}
                _ if field.flatten => {
                    return Err(layout(format!(
                        "field `{}` flattens {}, which is not a record or bit group",
                        field.name,
                        codec.describe()
                    )));
                }
                _ => {}
            }
        }

        // logical and wire keys must stay unique once flattened members are merged
        let mut logical: HashSet<&str> = HashSet::new();
        let mut wire: HashSet<&str> = HashSet::new();
        for field in rec.fields.iter().filter(|f| f.is_value()) {
            let pairs: Vec<(&str, &str)> = if field.flatten {
                self.flattened_wire_pairs(&field.codec)
                    .map_err(|e| layout(e.to_string()))?
            } else {
                vec![(field.name.as_str(), field.wire_name.as_str())]
            };
            for (name, wire_name) in pairs {
                if !logical.insert(name) || !wire.insert(wire_name) {
                    return Err(layout(format!(
                        "key `{name}` collides with another field"
                    )));
                }
            }
        }

        for field in &rec.fields {
            self.validate(&rec.name, &field.codec)?;
        }
        Ok(())
    }

    fn check_derived(
        &self,
        rec: &RecordSpec,
        at: usize,
        field: &FieldSpec,
        rule: &Derivation,
        codec: &TypeCodec,
    ) -> Result<(), String> {
        let unsigned = matches!(codec,
            TypeCodec::Primitive(Primitive::Int(kind)) if !kind.is_signed())
            || matches!(codec, TypeCodec::Primitive(Primitive::Bits { signed: false, .. }));
        if !unsigned || field.slot.is_none() || field.presence.is_optional() || field.flatten {
            return Err(format!(
                "derived field `{}` must be a required unsigned integer with a slot",
                field.name
            ));
        }
        let is_array = |name: &str, fields: &[FieldSpec]| {
            fields.iter().any(|f| {
                f.name == name
                    && f.is_wire_value()
                    && matches!(
                        self.deref(&f.codec),
                        Ok(TypeCodec::Array(_) | TypeCodec::Primitive(Primitive::Bytes(_)))
                    )
            })
        };
        match rule {
            Derivation::CountOf(name) if !is_array(name, &rec.fields) => Err(format!(
                "`{}` counts `{name}`, which is not an array field",
                field.name
            )),
            Derivation::CountWidth(name) if !is_array(name, &rec.fields[..at]) => Err(format!(
                "`{}` sizes indices into `{name}`, which is not an earlier array field",
                field.name
            )),
            Derivation::Fit { min } if *min > 32 => {
                Err(format!("`{}` has a minimum width of {min} bits", field.name))
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn flattened_wire_pairs<'a>(&'a self, codec: &'a TypeCodec) -> CodecResult<Vec<(&'a str, &'a str)>> {
        match self.deref(codec)? {
            TypeCodec::BitGroup(group) => Ok(group
                .members
                .iter()
                .map(|m| (m.name.as_str(), m.wire_name.as_str()))
                .collect()),
            TypeCodec::Record(rec) => {
                let mut pairs = Vec::new();
                for field in rec.fields.iter().filter(|f| f.is_value()) {
                    if field.flatten {
                        pairs.extend(self.flattened_wire_pairs(&field.codec)?);
                    } else {
                        pairs.push((field.name.as_str(), field.wire_name.as_str()));
                    }
                }
                Ok(pairs)
            }
            other => Err(CodecError::mismatch("record or bit group", other.describe())),
        }
    }

    fn validate_variant(&self, var: &VariantSpec) -> Result<(), SchemaError> {
        let invalid = |reason: String| SchemaError::InvalidVariant {
            name: var.name.clone(),
            reason,
        };
        if var.cases.is_empty() {
            return Err(invalid("no cases".to_string()));
        }
        let disc = self
            .deref(&var.discriminant_codec)
            .map_err(|e| invalid(e.to_string()))?;
        match disc {
            TypeCodec::Enum(_)
            | TypeCodec::Primitive(Primitive::Int(_))
            | TypeCodec::Primitive(Primitive::Bits { .. }) => {}
            other => {
                return Err(invalid(format!(
                    "discriminant codec {} is not an integer or enum",
                    other.describe()
                )))
            }
        }

        for (i, case) in var.cases.iter().enumerate() {
            if var.cases[..i].iter().any(|c| c.literal == case.literal) {
                return Err(invalid(format!("duplicate discriminant {}", case.literal)));
            }
            let code = discriminant_code(disc, &case.literal).map_err(|e| invalid(e.to_string()))?;
            if var.framing == Framing::SwfTagHeader && !(0..1024).contains(&code) {
                return Err(invalid(format!("tag code {code} does not fit the tag header")));
            }
            let rec = match case.record.id.and_then(|id| self.get(id)) {
                Some(TypeDef {
                    codec: TypeCodec::Record(rec),
                    ..
                }) => rec,
                _ => {
                    return Err(invalid(format!(
                        "case `{}` is not a record",
                        case.record.name
                    )))
                }
            };
            let first_ok = rec.fields.first().is_some_and(|f| {
                f.name == var.discriminant
                    && f.is_value()
                    && !f.presence.is_optional()
                    && matches!(&f.codec, TypeCodec::Literal(lit)
                        if *lit.codec == *var.discriminant_codec && lit.value == case.literal)
            });
            if !first_ok {
                return Err(invalid(format!(
                    "case `{}` must declare `{}` = {} as its first field",
                    rec.name, var.discriminant, case.literal
                )));
            }
        }
        Ok(())
    }
}

/// Integer code of a discriminant literal under its codec.
pub(crate) fn discriminant_code(codec: &TypeCodec, literal: &Value) -> CodecResult<i64> {
    match (codec, literal) {
        (TypeCodec::Enum(spec), Value::Enum(label)) => spec
            .by_label(label)
            .map(|v| v.code)
            .ok_or_else(|| {
                ErrorKind::UnknownVariant {
                    discriminant: label.clone(),
                }
                .into()
            }),
        (TypeCodec::Primitive(_), Value::Int(code)) => Ok(*code),
        (_, other) => Err(CodecError::mismatch(codec.describe(), other.kind().name())),
    }
}

fn check_header(earlier: &[FieldSpec], header: &str, bit: u8) -> Result<(), String> {
    match earlier.iter().find(|f| f.name == header).map(|f| &f.role) {
        Some(FieldRole::PresenceHeader { width }) if bit < *width => Ok(()),
        Some(FieldRole::PresenceHeader { width }) => {
            Err(format!("bit {bit} is outside the {width}-bit header `{header}`"))
        }
        _ => Err(format!("`{header}` is not an earlier presence header")),
    }
}

/// Codecs a published slot can be read from.
fn publishes_int(reg: &SchemaRegistry, codec: &TypeCodec) -> bool {
    match codec {
        TypeCodec::Literal(lit) => reg.deref(&lit.codec).is_ok_and(|c| publishes_int(reg, c)),
        TypeCodec::Primitive(
            Primitive::Bool(_) | Primitive::Int(_) | Primitive::Bits { .. } | Primitive::EncodedU32,
        ) => true,
        _ => false,
    }
}

fn consumes_rest(reg: &SchemaRegistry, codec: &TypeCodec) -> bool {
    match codec {
        TypeCodec::Primitive(Primitive::Bytes(BytesMode::Remaining)) => true,
        TypeCodec::Array(arr) => arr.termination == Termination::Remaining,
        TypeCodec::Ref(_) => reg.deref(codec).is_ok_and(|c| consumes_rest(reg, c)),
        _ => false,
    }
}

fn check_prefix(prefix: &LengthPrefix) -> Result<(), String> {
    match prefix {
        LengthPrefix::Int(kind) if kind.is_signed() => {
            Err(format!("length prefix {} must be unsigned", kind.name()))
        }
        LengthPrefix::Bits(width) if !(1..=32).contains(width) => {
            Err(format!("length prefix of {width} bits"))
        }
        _ => Ok(()),
    }
}

fn check_primitive(p: &Primitive) -> Result<(), String> {
    match p {
        Primitive::Bits { width, .. } if !(1..=32).contains(width) => {
            Err(format!("bit field of {width} bits"))
        }
        Primitive::Str(crate::schema::StringMode::LengthPrefixed(prefix))
        | Primitive::Bytes(BytesMode::LengthPrefixed(prefix)) => check_prefix(prefix),
        _ => Ok(()),
    }
}

fn check_enum(spec: &EnumSpec) -> Result<(), String> {
    let (min, max) = match spec.repr {
        Primitive::Int(kind) => kind.range(),
        Primitive::Bits { width, signed } if (1..=32).contains(&width) => {
            crate::schema::int_range(width, signed)
        }
        other => return Err(format!("enum repr {} is not an integer", other.describe())),
    };
    if spec.variants.is_empty() {
        return Err("enum has no variants".to_string());
    }
    for (i, v) in spec.variants.iter().enumerate() {
        if v.code < min || v.code > max {
            return Err(format!("code {} of `{}` does not fit {}", v.code, v.label, spec.repr.describe()));
        }
        let earlier = &spec.variants[..i];
        if earlier.iter().any(|e| e.code == v.code || e.label == v.label) {
            return Err(format!("`{}` ({}) is declared twice", v.label, v.code));
        }
    }
    Ok(())
}

fn check_bit_group(group: &BitGroupSpec) -> Result<(), String> {
    if !(1..=5).contains(&group.width_bits) {
        return Err(format!("bit count field of {} bits", group.width_bits));
    }
    if group.width_bias > 32 {
        return Err(format!("width bias of {}", group.width_bias));
    }
    if group.axis_pair
        && (group.members.len() != 2
            || group
                .members
                .iter()
                .any(|m| m.kind != BitMemberKind::Signed || m.presence != Presence::Required))
    {
        return Err("an axis pair has exactly two required signed members".to_string());
    }
    for (i, member) in group.members.iter().enumerate() {
        if group.members[..i].iter().any(|m| m.name == member.name) {
            return Err(format!("duplicate member `{}`", member.name));
        }
        if !matches!(member.presence, Presence::Required | Presence::HeaderBit { .. }) {
            return Err(format!(
                "member `{}` must be required or header-bound",
                member.name
            ));
        }
    }
    Ok(())
}

/// Name-ordered schema export.
impl Serialize for SchemaRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.defs.len()))?;
        for def in &self.defs {
            map.serialize_entry(&def.name, &def.codec)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{prim, ArraySpec, FieldSpec};

    fn node_pair() -> SchemaBuilder {
        let mut b = SchemaBuilder::new();
        b.record(
            RecordSpec::new("Node")
                .required("id", prim::u8())
                .required(
                    "children",
                    TypeCodec::array_of(
                        prim::reference("Branch"),
                        Termination::LengthPrefix(LengthPrefix::Int(crate::schema::IntKind::U8)),
                    ),
                ),
        );
        b.record(RecordSpec::new("Branch").required("node", prim::reference("Node")));
        b
    }

    #[test]
    fn forward_references_bind() {
        let reg = node_pair().build().unwrap();
        assert_eq!(reg.len(), 2);
        match reg.resolve("Branch") {
            Some(TypeCodec::Record(rec)) => match &rec.fields[0].codec {
                TypeCodec::Ref(r) => assert_eq!(r.id(), reg.id_of("Node")),
                other => panic!("unexpected codec {other:?}"),
            },
            other => panic!("unexpected codec {other:?}"),
        }
    }

    #[test]
    fn duplicate_names_fail() {
        let mut b = node_pair();
        b.record(RecordSpec::new("Node"));
        assert_eq!(
            b.build().unwrap_err(),
            SchemaError::DuplicateName {
                name: "Node".to_string()
            }
        );
    }

    #[test]
    fn unresolved_reference_names_both_ends() {
        let mut b = SchemaBuilder::new();
        b.record(RecordSpec::new("Holder").required("x", prim::reference("Missing")));
        assert_eq!(
            b.build().unwrap_err(),
            SchemaError::UnresolvedReference {
                from: "Holder".to_string(),
                name: "Missing".to_string()
            }
        );
    }

    #[test]
    fn unbroken_cycle_is_infinite() {
        let mut b = SchemaBuilder::new();
        b.record(RecordSpec::new("A").required("b", prim::reference("B")));
        b.record(RecordSpec::new("B").required("a", prim::reference("A")));
        match b.build().unwrap_err() {
            SchemaError::InfiniteType { cycle, .. } => assert_eq!(cycle, "A -> B -> A"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn optional_field_breaks_cycle() {
        let mut b = SchemaBuilder::new();
        b.record(
            RecordSpec::new("List")
                .required("head", prim::u8())
                .field(FieldSpec::optional(
                    "tail",
                    prim::reference("List"),
                    Presence::LeadingBit,
                )),
        );
        assert!(b.build().is_ok());
    }

    #[test]
    fn non_empty_array_keeps_cycle() {
        let mut b = SchemaBuilder::new();
        b.record(RecordSpec::new("Tree").required(
            "kids",
            TypeCodec::array(
                ArraySpec::new(prim::reference("Tree"), Termination::Remaining).min_len(1),
            ),
        ));
        assert!(matches!(
            b.build().unwrap_err(),
            SchemaError::InfiniteType { .. }
        ));
    }

    #[test]
    fn hidden_fields_must_be_literals() {
        let mut b = SchemaBuilder::new();
        let mut field = FieldSpec::new("reserved", prim::ubits(4));
        field.role = FieldRole::Hidden;
        b.record(RecordSpec::new("R").field(field));
        assert!(matches!(
            b.build().unwrap_err(),
            SchemaError::InvalidLayout { .. }
        ));
    }

    #[test]
    fn remaining_presence_must_trail() {
        let mut b = SchemaBuilder::new();
        b.record(
            RecordSpec::new("R")
                .field(FieldSpec::optional("a", prim::u8(), Presence::Remaining))
                .required("b", prim::u8()),
        );
        assert!(matches!(
            b.build().unwrap_err(),
            SchemaError::InvalidLayout { .. }
        ));
    }

    #[test]
    fn header_bits_need_an_earlier_header() {
        let mut b = SchemaBuilder::new();
        b.record(
            RecordSpec::new("R")
                .field(FieldSpec::optional(
                    "a",
                    prim::u8(),
                    Presence::header_bit("flags", 0),
                ))
                .field(FieldSpec::presence_header("flags", 1)),
        );
        assert!(matches!(
            b.build().unwrap_err(),
            SchemaError::InvalidLayout { .. }
        ));
    }

    #[test]
    fn variant_case_must_lead_with_its_literal() {
        let mut b = SchemaBuilder::new();
        b.variant(
            VariantSpec::new("Shape", "kind", prim::u8())
                .case(Value::Int(1), "Circle")
                .case(Value::Int(2), "Square"),
        );
        b.record(
            RecordSpec::new("Circle")
                .field(FieldSpec::literal("kind", prim::u8(), Value::Int(1)))
                .required("radius", prim::u16()),
        );
        b.record(
            RecordSpec::new("Square")
                .required("side", prim::u16())
                .field(FieldSpec::literal("kind", prim::u8(), Value::Int(2))),
        );
        match b.build().unwrap_err() {
            SchemaError::InvalidVariant { name, reason } => {
                assert_eq!(name, "Shape");
                assert!(reason.contains("Square"), "{reason}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn duplicate_discriminants_fail() {
        let mut b = SchemaBuilder::new();
        b.variant(
            VariantSpec::new("Shape", "kind", prim::u8())
                .case(Value::Int(1), "Circle")
                .case(Value::Int(1), "Circle"),
        );
        b.record(
            RecordSpec::new("Circle").field(FieldSpec::literal("kind", prim::u8(), Value::Int(1))),
        );
        assert!(matches!(
            b.build().unwrap_err(),
            SchemaError::InvalidVariant { .. }
        ));
    }

    #[test]
    fn wire_names_are_memoized() {
        let mut b = SchemaBuilder::new();
        b.record(
            RecordSpec::new("R")
                .required("characterId", prim::u16())
                .field(FieldSpec::new("ratio", prim::u16()).rename("morph_ratio")),
        );
        let reg = b.build().unwrap();
        let rec = reg.record_of("R").unwrap();
        assert_eq!(rec.fields[0].wire_name(), "character_id");
        assert_eq!(rec.fields[1].wire_name(), "morph_ratio");
    }

    #[test]
    fn registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SchemaRegistry>();
    }
}
