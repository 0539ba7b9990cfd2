//! DWARF name index and type layout extraction.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use gimli::{
    constants, AttributeValue, DebuggingInformationEntry, Operation, Reader as _, Unit, UnitOffset, UnitSectionOffset,
    UnitType,
};
use tracing::trace;

use super::{map_dwarf_error, OwnedDwarf, OwnedReader};
use crate::error::{FormatterError, Result};
use crate::types::descriptor::pointer_type_name;
use crate::types::{
    normalize_type_name, Address, AggregateKind, FieldDescriptor, Qualifiers, ScalarEncoding, TemplateArg,
    TypeDescriptor, TypeKind,
};

const MAX_TYPE_REF_DEPTH: usize = 32;

type Entry<'abbrev, 'unit> = DebuggingInformationEntry<'abbrev, 'unit, OwnedReader>;

/// A DIE: unit index plus offset inside that unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct DieRef
{
    unit: usize,
    offset: usize,
}

impl DieRef
{
    fn unit_offset(self) -> UnitOffset<usize>
    {
        UnitOffset(self.offset)
    }
}

/// A global variable found in debug info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalVariable
{
    pub name: String,
    /// Link-time address (add the load bias for PIE binaries)
    pub address: Address,
    pub type_name: String,
}

#[derive(Debug, Clone)]
enum Scope
{
    Named(String),
    Function,
    Other,
}

/// Qualified names of every type and global variable in a binary.
pub(crate) struct DwarfIndex
{
    units: Vec<Unit<OwnedReader>>,
    names: HashMap<DieRef, String>,
    types: HashMap<String, DieRef>,
    globals: HashMap<String, DieRef>,
}

impl DwarfIndex
{
    pub(crate) fn build(dwarf: &OwnedDwarf) -> Result<Self>
    {
        let mut units = Vec::new();
        let mut headers = dwarf.units();
        while let Some(header) = headers
            .next()
            .map_err(|err| map_dwarf_error("reading .debug_info unit header", err))?
        {
            units.push(
                dwarf
                    .unit(header)
                    .map_err(|err| map_dwarf_error("parsing compilation unit", err))?,
            );
        }

        let mut type_headers = dwarf.type_units();
        while let Some(header) = type_headers
            .next()
            .map_err(|err| map_dwarf_error("reading .debug_types unit header", err))?
        {
            units.push(dwarf.unit(header).map_err(|err| map_dwarf_error("parsing type unit", err))?);
        }

        let mut index = Self {
            units,
            names: HashMap::new(),
            types: HashMap::new(),
            globals: HashMap::new(),
        };
        let mut specifications = Vec::new();
        for unit_index in 0..index.units.len() {
            index.scan_unit(dwarf, unit_index, &mut specifications)?;
        }

        // Out-of-class definitions of static members name their declaration.
        for (die, declaration) in specifications {
            if let Some(name) = index.names.get(&declaration).cloned() {
                index.globals.entry(name).or_insert(die);
            }
        }
        Ok(index)
    }

    fn scan_unit(&mut self, dwarf: &OwnedDwarf, unit_index: usize, specifications: &mut Vec<(DieRef, DieRef)>) -> Result<()>
    {
        let unit = &self.units[unit_index];
        let mut scopes: Vec<Scope> = Vec::new();
        let mut depth: isize = 0;
        let mut cursor = unit.entries();
        while let Some((delta, entry)) = cursor.next_dfs().map_err(|err| map_dwarf_error("traversing DIE tree", err))? {
            depth += delta;
            scopes.truncate(usize::try_from(depth).unwrap_or(0));

            let die = DieRef {
                unit: unit_index,
                offset: entry.offset().0,
            };
            let name = entry_name(dwarf, unit, entry)?;
            let in_function = scopes.iter().any(|scope| matches!(scope, Scope::Function));
            let qualified = name.as_ref().map(|name| qualify(&scopes, name));

            let tag = entry.tag();
            scopes.push(match tag {
                constants::DW_TAG_namespace => {
                    Scope::Named(name.clone().unwrap_or_else(|| "(anonymous namespace)".to_string()))
                }
                constants::DW_TAG_structure_type | constants::DW_TAG_class_type | constants::DW_TAG_union_type => {
                    name.clone().map_or(Scope::Other, Scope::Named)
                }
                constants::DW_TAG_subprogram | constants::DW_TAG_lexical_block => Scope::Function,
                _ => Scope::Other,
            });

            if in_function {
                continue;
            }
            if let Some(qualified) = &qualified {
                self.names.insert(die, qualified.clone());
            }

            match tag {
                constants::DW_TAG_structure_type
                | constants::DW_TAG_class_type
                | constants::DW_TAG_union_type
                | constants::DW_TAG_enumeration_type
                | constants::DW_TAG_typedef
                | constants::DW_TAG_base_type => {
                    if let Some(qualified) = qualified {
                        if !flag(entry, constants::DW_AT_declaration)? {
                            self.types.entry(normalize_type_name(&qualified)).or_insert(die);
                        }
                    }
                }
                constants::DW_TAG_variable => {
                    if entry
                        .attr(constants::DW_AT_location)
                        .map_err(|err| map_dwarf_error("reading DW_AT_location", err))?
                        .is_none()
                    {
                        continue;
                    }
                    match qualified {
                        Some(qualified) => {
                            self.globals.entry(qualified).or_insert(die);
                        }
                        None => {
                            if let Some(value) = entry
                                .attr(constants::DW_AT_specification)
                                .map_err(|err| map_dwarf_error("reading DW_AT_specification", err))?
                                .map(|attr| attr.value())
                            {
                                if let Some(declaration) = self.reference(unit_index, value) {
                                    specifications.push((die, declaration));
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub(crate) fn find_type(&self, name: &str) -> Option<DieRef>
    {
        self.types.get(name).copied()
    }

    pub(crate) fn find_global(&self, name: &str) -> Option<DieRef>
    {
        self.globals
            .get(name)
            .or_else(|| self.globals.get(name.trim_start_matches("::")))
            .copied()
    }

    pub(crate) fn type_names(&self) -> impl Iterator<Item = &str>
    {
        self.types.keys().map(String::as_str)
    }

    pub(crate) fn type_count(&self) -> usize
    {
        self.types.len()
    }

    pub(crate) fn global_count(&self) -> usize
    {
        self.globals.len()
    }

    fn unit(&self, die: DieRef) -> &Unit<OwnedReader>
    {
        &self.units[die.unit]
    }

    /// Target of a type or specification reference made from `unit_index`.
    fn reference(&self, unit_index: usize, value: AttributeValue<OwnedReader>) -> Option<DieRef>
    {
        match value {
            AttributeValue::UnitRef(offset) => Some(DieRef {
                unit: unit_index,
                offset: offset.0,
            }),
            AttributeValue::DebugInfoRef(offset) => {
                let target = UnitSectionOffset::from(offset);
                self.units.iter().enumerate().find_map(|(unit, candidate)| {
                    target.to_unit_offset(candidate).map(|offset| DieRef {
                        unit,
                        offset: offset.0,
                    })
                })
            }
            AttributeValue::DebugTypesRef(signature) => {
                self.units
                    .iter()
                    .enumerate()
                    .find_map(|(unit, candidate)| match candidate.header.type_() {
                        UnitType::Type {
                            type_signature,
                            type_offset,
                        }
                        | UnitType::SplitType {
                            type_signature,
                            type_offset,
                        } if type_signature == signature => Some(DieRef {
                            unit,
                            offset: type_offset.0,
                        }),
                        _ => None,
                    })
            }
            _ => None,
        }
    }
}

fn qualify(scopes: &[Scope], name: &str) -> String
{
    let mut qualified = String::new();
    for scope in scopes {
        if let Scope::Named(scope) = scope {
            qualified.push_str(scope);
            qualified.push_str("::");
        }
    }
    qualified.push_str(name);
    qualified
}

fn entry_name(dwarf: &OwnedDwarf, unit: &Unit<OwnedReader>, entry: &Entry<'_, '_>) -> Result<Option<String>>
{
    let Some(attr) = entry
        .attr(constants::DW_AT_name)
        .map_err(|err| map_dwarf_error("reading DW_AT_name", err))?
    else {
        return Ok(None);
    };
    let reader = dwarf
        .attr_string(unit, attr.value())
        .map_err(|err| map_dwarf_error("resolving DWARF string", err))?;
    let owned = match reader.to_string() {
        Ok(cow) => cow.into_owned(),
        Err(_) => reader
            .to_string_lossy()
            .map_err(|err| map_dwarf_error("decoding DWARF string", err))?
            .into_owned(),
    };
    Ok(Some(owned))
}

fn flag(entry: &Entry<'_, '_>, name: constants::DwAt) -> Result<bool>
{
    let attr = entry
        .attr(name)
        .map_err(|err| map_dwarf_error("reading flag attribute", err))?;
    Ok(matches!(attr.map(|attr| attr.value()), Some(AttributeValue::Flag(true))))
}

fn udata(entry: &Entry<'_, '_>, name: constants::DwAt) -> Result<Option<u64>>
{
    Ok(entry
        .attr(name)
        .map_err(|err| map_dwarf_error("reading constant attribute", err))?
        .and_then(|attr| attr.udata_value()))
}

fn sdata(entry: &Entry<'_, '_>, name: constants::DwAt) -> Result<Option<i64>>
{
    Ok(entry
        .attr(name)
        .map_err(|err| map_dwarf_error("reading constant attribute", err))?
        .and_then(|attr| {
            attr.sdata_value()
                .or_else(|| attr.udata_value().map(|value| value as i64))
        }))
}

fn scalar_encoding(entry: &Entry<'_, '_>) -> Result<ScalarEncoding>
{
    let attr = entry
        .attr(constants::DW_AT_encoding)
        .map_err(|err| map_dwarf_error("reading DW_AT_encoding", err))?;
    let encoding = match attr.map(|attr| attr.value()) {
        Some(AttributeValue::Encoding(encoding)) => encoding,
        _ => return Ok(ScalarEncoding::Signed),
    };
    Ok(match encoding {
        constants::DW_ATE_boolean => ScalarEncoding::Bool,
        constants::DW_ATE_float => ScalarEncoding::Float,
        constants::DW_ATE_signed_char => ScalarEncoding::SignedChar,
        constants::DW_ATE_unsigned_char | constants::DW_ATE_UTF => ScalarEncoding::UnsignedChar,
        constants::DW_ATE_unsigned => ScalarEncoding::Unsigned,
        _ => ScalarEncoding::Signed,
    })
}

/// Builds [`TypeDescriptor`]s from indexed DIEs, caching one per DIE.
pub(crate) struct TypeBuilder<'a>
{
    dwarf: &'a OwnedDwarf,
    index: &'a DwarfIndex,
    pointer_size: u64,
    cache: &'a RwLock<HashMap<DieRef, Arc<TypeDescriptor>>>,
}

impl<'a> TypeBuilder<'a>
{
    pub(crate) fn new(
        dwarf: &'a OwnedDwarf,
        index: &'a DwarfIndex,
        pointer_size: u64,
        cache: &'a RwLock<HashMap<DieRef, Arc<TypeDescriptor>>>,
    ) -> Self
    {
        Self {
            dwarf,
            index,
            pointer_size,
            cache,
        }
    }

    pub(crate) fn describe(&self, die: DieRef) -> Result<Arc<TypeDescriptor>>
    {
        self.describe_at(die, 0)
    }

    fn describe_at(&self, die: DieRef, depth: usize) -> Result<Arc<TypeDescriptor>>
    {
        if depth >= MAX_TYPE_REF_DEPTH {
            return Err(FormatterError::Dwarf(format!(
                "type reference chain deeper than {MAX_TYPE_REF_DEPTH} at offset {:#x}",
                die.offset
            )));
        }
        if let Some(existing) = self.cache.read().unwrap_or_else(PoisonError::into_inner).get(&die) {
            return Ok(existing.clone());
        }

        let unit = self.index.unit(die);
        let entry = unit
            .entry(die.unit_offset())
            .map_err(|err| map_dwarf_error("resolving type reference", err))?;
        let descriptor = match entry.tag() {
            constants::DW_TAG_base_type => TypeDescriptor::scalar(
                self.name_of(die, unit, &entry)?,
                scalar_encoding(&entry)?,
                udata(&entry, constants::DW_AT_byte_size)?.unwrap_or(0),
            ),
            constants::DW_TAG_structure_type | constants::DW_TAG_class_type | constants::DW_TAG_union_type => {
                self.aggregate(die, unit, &entry, depth)?
            }
            constants::DW_TAG_enumeration_type => self.enumeration(die, unit, &entry, depth)?,
            constants::DW_TAG_array_type => self.array(die, unit, &entry, depth)?,
            constants::DW_TAG_pointer_type => TypeDescriptor::pointer(
                &self.referenced_name(die, &entry, depth)?,
                udata(&entry, constants::DW_AT_byte_size)?.unwrap_or(self.pointer_size),
            ),
            constants::DW_TAG_reference_type | constants::DW_TAG_rvalue_reference_type => TypeDescriptor::reference(
                &self.referenced_name(die, &entry, depth)?,
                udata(&entry, constants::DW_AT_byte_size)?.unwrap_or(self.pointer_size),
            ),
            constants::DW_TAG_typedef => {
                let target = self.referenced(die, &entry, depth)?;
                TypeDescriptor::typedef(self.name_of(die, unit, &entry)?, target)
            }
            constants::DW_TAG_const_type => {
                TypeDescriptor::qualified(Qualifiers::CONST, self.referenced(die, &entry, depth)?)
            }
            constants::DW_TAG_volatile_type => {
                TypeDescriptor::qualified(Qualifiers::VOLATILE, self.referenced(die, &entry, depth)?)
            }
            constants::DW_TAG_atomic_type => {
                let target = self.referenced(die, &entry, depth)?;
                TypeDescriptor::typedef(format!("_Atomic({})", target.name()), target)
            }
            tag => {
                trace!(offset = die.offset, %tag, "describing unsupported DWARF tag as void");
                TypeDescriptor::void()
            }
        };

        let descriptor = Arc::new(descriptor);
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        Ok(cache.entry(die).or_insert(descriptor).clone())
    }

    /// C++ spelling of the type at `die`, without building its layout.
    fn type_name(&self, die: DieRef, depth: usize) -> Result<String>
    {
        if depth >= MAX_TYPE_REF_DEPTH {
            return Ok("void".to_string());
        }
        let unit = self.index.unit(die);
        let entry = unit
            .entry(die.unit_offset())
            .map_err(|err| map_dwarf_error("resolving type reference", err))?;
        let name = match entry.tag() {
            constants::DW_TAG_pointer_type => pointer_type_name(&self.referenced_name(die, &entry, depth)?, '*'),
            constants::DW_TAG_reference_type => pointer_type_name(&self.referenced_name(die, &entry, depth)?, '&'),
            constants::DW_TAG_rvalue_reference_type => {
                format!("{}&", pointer_type_name(&self.referenced_name(die, &entry, depth)?, '&'))
            }
            constants::DW_TAG_const_type => qualified_name("const", self.referenced_name(die, &entry, depth)?),
            constants::DW_TAG_volatile_type => qualified_name("volatile", self.referenced_name(die, &entry, depth)?),
            constants::DW_TAG_atomic_type => format!("_Atomic({})", self.referenced_name(die, &entry, depth)?),
            constants::DW_TAG_array_type => {
                let element = self.referenced_name(die, &entry, depth)?;
                let dims = self.dimensions(unit, die)?;
                dims.iter().fold(element, |name, count| format!("{name}[{count}]"))
            }
            // Function types are shown as opaque code pointers.
            constants::DW_TAG_subroutine_type => "void".to_string(),
            _ => self.name_of(die, unit, &entry)?,
        };
        Ok(normalize_type_name(&name))
    }

    fn name_of(&self, die: DieRef, unit: &Unit<OwnedReader>, entry: &Entry<'_, '_>) -> Result<String>
    {
        if let Some(name) = self.index.names.get(&die) {
            return Ok(name.clone());
        }
        Ok(entry_name(self.dwarf, unit, entry)?.unwrap_or_else(|| match entry.tag() {
            constants::DW_TAG_union_type => "(anonymous union)".to_string(),
            constants::DW_TAG_structure_type | constants::DW_TAG_class_type => "(anonymous struct)".to_string(),
            constants::DW_TAG_enumeration_type => "(anonymous enum)".to_string(),
            _ => "void".to_string(),
        }))
    }

    fn type_ref(&self, die: DieRef, entry: &Entry<'_, '_>) -> Result<Option<DieRef>>
    {
        let Some(attr) = entry
            .attr(constants::DW_AT_type)
            .map_err(|err| map_dwarf_error("reading DW_AT_type", err))?
        else {
            return Ok(None);
        };
        Ok(self.index.reference(die.unit, attr.value()))
    }

    /// Layout of the `DW_AT_type` of `entry`; `void` when absent.
    fn referenced(&self, die: DieRef, entry: &Entry<'_, '_>, depth: usize) -> Result<Arc<TypeDescriptor>>
    {
        match self.type_ref(die, entry)? {
            Some(target) => self.describe_at(target, depth + 1),
            None => Ok(Arc::new(TypeDescriptor::void())),
        }
    }

    fn referenced_name(&self, die: DieRef, entry: &Entry<'_, '_>, depth: usize) -> Result<String>
    {
        match self.type_ref(die, entry)? {
            Some(target) => self.type_name(target, depth + 1),
            None => Ok("void".to_string()),
        }
    }

    fn aggregate(&self, die: DieRef, unit: &Unit<OwnedReader>, entry: &Entry<'_, '_>, depth: usize) -> Result<TypeDescriptor>
    {
        let kind = match entry.tag() {
            constants::DW_TAG_union_type => AggregateKind::Union,
            constants::DW_TAG_class_type => AggregateKind::Class,
            _ => AggregateKind::Struct,
        };
        let mut descriptor = TypeDescriptor::aggregate(
            normalize_type_name(&self.name_of(die, unit, entry)?),
            kind,
            udata(entry, constants::DW_AT_byte_size)?.unwrap_or(0),
        );

        let mut tree = unit
            .entries_tree(Some(die.unit_offset()))
            .map_err(|err| map_dwarf_error("building struct tree", err))?;
        let root = tree.root().map_err(|err| map_dwarf_error("navigating struct root", err))?;
        let mut children = root.children();
        while let Some(child) = children
            .next()
            .map_err(|err| map_dwarf_error("iterating struct children", err))?
        {
            let child_entry = child.entry();
            let child_die = DieRef {
                unit: die.unit,
                offset: child_entry.offset().0,
            };
            match child_entry.tag() {
                constants::DW_TAG_member => {
                    // Static data members are declarations without a location.
                    if flag(child_entry, constants::DW_AT_declaration)? || flag(child_entry, constants::DW_AT_external)? {
                        continue;
                    }
                    let ty = self.referenced(child_die, child_entry, depth)?;
                    let name = entry_name(self.dwarf, unit, child_entry)?.unwrap_or_default();
                    descriptor.push_field(FieldDescriptor {
                        name,
                        ty,
                        offset: member_offset(child_entry)?,
                        is_base: false,
                    });
                }
                constants::DW_TAG_inheritance => {
                    let ty = self.referenced(child_die, child_entry, depth)?;
                    descriptor.push_field(FieldDescriptor {
                        name: ty.name().to_string(),
                        ty,
                        offset: member_offset(child_entry)?,
                        is_base: true,
                    });
                }
                constants::DW_TAG_template_type_parameter => {
                    let name = self.referenced_name(child_die, child_entry, depth)?;
                    descriptor.push_template_arg(TemplateArg::Type(name));
                }
                constants::DW_TAG_template_value_parameter => {
                    if let Some(value) = sdata(child_entry, constants::DW_AT_const_value)? {
                        descriptor.push_template_arg(TemplateArg::Value(value));
                    }
                }
                _ => {}
            }
        }
        Ok(descriptor)
    }

    fn enumeration(&self, die: DieRef, unit: &Unit<OwnedReader>, entry: &Entry<'_, '_>, depth: usize) -> Result<TypeDescriptor>
    {
        let encoding = match self.type_ref(die, entry)? {
            Some(underlying) => match self.describe_at(underlying, depth + 1)?.canonical().kind() {
                TypeKind::Scalar(encoding) => *encoding,
                _ => ScalarEncoding::Signed,
            },
            None => ScalarEncoding::Signed,
        };

        let mut enumerators = Vec::new();
        let mut tree = unit
            .entries_tree(Some(die.unit_offset()))
            .map_err(|err| map_dwarf_error("building enum tree", err))?;
        let root = tree.root().map_err(|err| map_dwarf_error("navigating enum root", err))?;
        let mut children = root.children();
        while let Some(child) = children
            .next()
            .map_err(|err| map_dwarf_error("iterating enumerators", err))?
        {
            let child_entry = child.entry();
            if child_entry.tag() != constants::DW_TAG_enumerator {
                continue;
            }
            let name = entry_name(self.dwarf, unit, child_entry)?.unwrap_or_default();
            let value = sdata(child_entry, constants::DW_AT_const_value)?.unwrap_or(0);
            enumerators.push((name, value));
        }

        Ok(TypeDescriptor::enumeration(
            normalize_type_name(&self.name_of(die, unit, entry)?),
            encoding,
            udata(entry, constants::DW_AT_byte_size)?.unwrap_or(4),
            enumerators,
        ))
    }

    /// Element counts of each `DW_TAG_subrange_type`, outermost first.
    fn dimensions(&self, unit: &Unit<OwnedReader>, die: DieRef) -> Result<Vec<u64>>
    {
        let mut dims = Vec::new();
        let mut tree = unit
            .entries_tree(Some(die.unit_offset()))
            .map_err(|err| map_dwarf_error("building array tree", err))?;
        let root = tree.root().map_err(|err| map_dwarf_error("navigating array root", err))?;
        let mut children = root.children();
        while let Some(child) = children
            .next()
            .map_err(|err| map_dwarf_error("iterating array subranges", err))?
        {
            let child_entry = child.entry();
            if child_entry.tag() != constants::DW_TAG_subrange_type {
                continue;
            }
            let count = match udata(child_entry, constants::DW_AT_count)? {
                Some(count) => count,
                None => sdata(child_entry, constants::DW_AT_upper_bound)?
                    .and_then(|upper| u64::try_from(upper).ok())
                    .map_or(0, |upper| upper + 1),
            };
            dims.push(count);
        }
        if dims.is_empty() {
            dims.push(0);
        }
        Ok(dims)
    }

    fn array(&self, die: DieRef, unit: &Unit<OwnedReader>, entry: &Entry<'_, '_>, depth: usize) -> Result<TypeDescriptor>
    {
        let mut element = self.referenced(die, entry, depth)?;
        let mut dims = self.dimensions(unit, die)?;
        let outermost = dims.remove(0);
        for count in dims.into_iter().rev() {
            element = Arc::new(TypeDescriptor::array(element, count));
        }
        Ok(TypeDescriptor::array(element, outermost))
    }

    /// Resolve the location and type of an indexed global.
    pub(crate) fn global(&self, name: &str, die: DieRef) -> Result<Option<GlobalVariable>>
    {
        let unit = self.index.unit(die);
        let entry = unit
            .entry(die.unit_offset())
            .map_err(|err| map_dwarf_error("reading variable", err))?;
        let Some(AttributeValue::Exprloc(expression)) = entry
            .attr(constants::DW_AT_location)
            .map_err(|err| map_dwarf_error("reading DW_AT_location", err))?
            .map(|attr| attr.value())
        else {
            return Ok(None);
        };

        let mut operations = expression.operations(unit.encoding());
        let address = match operations
            .next()
            .map_err(|err| map_dwarf_error("decoding location expression", err))?
        {
            Some(Operation::Address { address }) => address,
            Some(Operation::AddressIndex { index }) => self
                .dwarf
                .address(unit, index)
                .map_err(|err| map_dwarf_error("reading .debug_addr", err))?,
            _ => {
                trace!(name, "global has a non-static location");
                return Ok(None);
            }
        };

        // Definitions of static members carry their type on the declaration.
        let mut typed = die;
        if self.type_ref(die, &entry)?.is_none() {
            if let Some(value) = entry
                .attr(constants::DW_AT_specification)
                .map_err(|err| map_dwarf_error("reading DW_AT_specification", err))?
                .map(|attr| attr.value())
            {
                if let Some(declaration) = self.index.reference(die.unit, value) {
                    typed = declaration;
                }
            }
        }
        let typed_entry = self
            .index
            .unit(typed)
            .entry(typed.unit_offset())
            .map_err(|err| map_dwarf_error("reading variable declaration", err))?;
        let type_name = self.referenced_name(typed, &typed_entry, 0)?;

        Ok(Some(GlobalVariable {
            name: name.to_string(),
            address: Address::new(address),
            type_name,
        }))
    }
}

fn member_offset(entry: &Entry<'_, '_>) -> Result<u64>
{
    if let Some(bytes) = udata(entry, constants::DW_AT_data_member_location)? {
        return Ok(bytes);
    }
    if let Some(bits) = udata(entry, constants::DW_AT_data_bit_offset)? {
        return Ok(bits / 8);
    }
    Ok(0)
}

fn qualified_name(qualifier: &str, name: String) -> String
{
    if name.ends_with('*') || name.ends_with('&') {
        format!("{name} {qualifier}")
    } else {
        format!("{qualifier} {name}")
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_qualify_skips_unnamed_scopes()
    {
        let scopes = vec![
            Scope::Named("std".into()),
            Scope::Other,
            Scope::Named("__1".into()),
        ];
        assert_eq!(qualify(&scopes, "atomic<int>"), "std::__1::atomic<int>");
        assert_eq!(qualify(&[], "Parent"), "Parent");
    }

    #[test]
    fn test_qualified_name_binds_to_pointer()
    {
        assert_eq!(qualified_name("const", "int".into()), "const int");
        assert_eq!(qualified_name("const", "Parent *".into()), "Parent * const");
    }
}
