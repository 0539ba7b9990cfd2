//! Binary image parsing and DWARF section loading.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use gimli::{Dwarf, EndianArcSlice, RunTimeEndian, SectionId};
use object::{Object, ObjectSection};
use once_cell::sync::OnceCell;
use tracing::{debug, info};

use super::dwarf::{DieRef, DwarfIndex, GlobalVariable, TypeBuilder};
use super::{OwnedDwarf, OwnedReader};
use crate::error::{FormatterError, Result};
use crate::memory::ByteOrder;
use crate::types::{normalize_type_name, TypeDescriptor, TypeSource};

const DWARF_SECTIONS: &[(&str, &[&str])] = &[
    (".debug_abbrev", &[".debug_abbrev", "__debug_abbrev"]),
    (".debug_addr", &[".debug_addr", "__debug_addr"]),
    (".debug_info", &[".debug_info", "__debug_info"]),
    (".debug_line", &[".debug_line", "__debug_line"]),
    (".debug_line_str", &[".debug_line_str", "__debug_line_str"]),
    (".debug_ranges", &[".debug_ranges", "__debug_ranges"]),
    (".debug_rnglists", &[".debug_rnglists", "__debug_rnglists"]),
    (".debug_str", &[".debug_str", "__debug_str"]),
    (".debug_str_offsets", &[".debug_str_offsets", "__debug_str_offsets"]),
    (".debug_types", &[".debug_types", "__debug_types"]),
    (".debug_loc", &[".debug_loc", "__debug_loc"]),
    (".debug_loclists", &[".debug_loclists", "__debug_loclists"]),
];

fn load_section_bytes(file: &object::File<'_>, names: &[&str]) -> Result<Arc<[u8]>>
{
    for name in names {
        if let Some(section) = file.section_by_name(name) {
            let data = section
                .uncompressed_data()
                .map_err(|err| FormatterError::InvalidArgument(format!("failed to read {name}: {err}")))?;
            return Ok(match data {
                Cow::Borrowed(bytes) => Arc::<[u8]>::from(bytes.to_vec()),
                Cow::Owned(vec) => vec.into(),
            });
        }
    }

    Ok(Arc::<[u8]>::from(Vec::new()))
}

/// An executable or shared library with its DWARF loaded lazily.
pub struct BinaryImage
{
    path: PathBuf,
    endian: RunTimeEndian,
    pointer_size: u64,
    debug_sections: HashMap<&'static str, Arc<[u8]>>,
    dwarf_cache: OnceCell<OwnedDwarf>,
    index_cache: OnceCell<DwarfIndex>,
    type_cache: RwLock<HashMap<DieRef, Arc<TypeDescriptor>>>,
}

impl std::fmt::Debug for BinaryImage
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("BinaryImage")
            .field("path", &self.path)
            .field("endian", &self.endian)
            .field("pointer_size", &self.pointer_size)
            .finish_non_exhaustive()
    }
}

impl BinaryImage
{
    /// Read and parse the binary at `path`.
    ///
    /// Only the section table is parsed here; DWARF is indexed on first use.
    ///
    /// ## Errors
    ///
    /// - `Io`: the file can't be read
    /// - `InvalidArgument`: the file is not an object file the `object` crate understands
    pub fn open(path: impl AsRef<Path>) -> Result<Self>
    {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        Self::parse(path, &bytes)
    }

    /// Parse an in-memory copy of the binary at `path`.
    ///
    /// ## Errors
    ///
    /// Returns `InvalidArgument` if `bytes` is not a supported object file.
    pub fn parse(path: &Path, bytes: &[u8]) -> Result<Self>
    {
        let file = object::File::parse(bytes)
            .map_err(|err| FormatterError::InvalidArgument(format!("failed to parse {}: {err}", path.display())))?;

        let endian = if file.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };
        let pointer_size = if file.is_64() { 8 } else { 4 };

        let mut sections = HashMap::new();
        for (canonical, aliases) in DWARF_SECTIONS {
            let data = load_section_bytes(&file, aliases)?;
            sections.insert(*canonical, data);
        }

        info!(path = %path.display(), pointer_size, "opened binary image");
        Ok(Self {
            path: path.to_path_buf(),
            endian,
            pointer_size,
            debug_sections: sections,
            dwarf_cache: OnceCell::new(),
            index_cache: OnceCell::new(),
            type_cache: RwLock::new(HashMap::new()),
        })
    }

    pub fn path(&self) -> &Path
    {
        &self.path
    }

    pub fn byte_order(&self) -> ByteOrder
    {
        match self.endian {
            RunTimeEndian::Little => ByteOrder::Little,
            RunTimeEndian::Big => ByteOrder::Big,
        }
    }

    /// Whether the image carries any `.debug_info`.
    pub fn has_debug_info(&self) -> bool
    {
        self.debug_sections
            .get(".debug_info")
            .is_some_and(|data| !data.is_empty())
    }

    fn dwarf(&self) -> Result<&OwnedDwarf>
    {
        self.dwarf_cache.get_or_try_init(|| {
            Dwarf::load(|section| Ok::<_, gimli::Error>(self.section_reader(section)))
                .map_err(|err| FormatterError::Dwarf(format!("failed to load DWARF: {err}")))
        })
    }

    fn index(&self) -> Result<&DwarfIndex>
    {
        self.index_cache.get_or_try_init(|| {
            let index = DwarfIndex::build(self.dwarf()?)?;
            debug!(
                path = %self.path.display(),
                types = index.type_count(),
                globals = index.global_count(),
                "indexed DWARF"
            );
            Ok(index)
        })
    }

    fn section_reader(&self, id: SectionId) -> OwnedReader
    {
        let key = match id {
            SectionId::DebugAbbrev => ".debug_abbrev",
            SectionId::DebugAddr => ".debug_addr",
            SectionId::DebugInfo => ".debug_info",
            SectionId::DebugLine => ".debug_line",
            SectionId::DebugLineStr => ".debug_line_str",
            SectionId::DebugRanges => ".debug_ranges",
            SectionId::DebugRngLists => ".debug_rnglists",
            SectionId::DebugStr => ".debug_str",
            SectionId::DebugStrOffsets => ".debug_str_offsets",
            SectionId::DebugTypes => ".debug_types",
            SectionId::DebugLoc => ".debug_loc",
            SectionId::DebugLocLists => ".debug_loclists",
            _ => "",
        };

        let data = self
            .debug_sections
            .get(key)
            .cloned()
            .unwrap_or_else(|| Arc::<[u8]>::from(Vec::new()));
        EndianArcSlice::new(data, self.endian)
    }

    fn builder(&self) -> Result<TypeBuilder<'_>>
    {
        Ok(TypeBuilder::new(
            self.dwarf()?,
            self.index()?,
            self.pointer_size,
            &self.type_cache,
        ))
    }

    /// Describe the type called `name` (fully qualified, e.g. `std::__1::atomic<int>`).
    ///
    /// ## Errors
    ///
    /// Returns `Dwarf` if the debug info is malformed.
    pub fn describe_type(&self, name: &str) -> Result<Option<Arc<TypeDescriptor>>>
    {
        let key = normalize_type_name(name);
        let Some(die) = self.index()?.find_type(&key) else {
            return Ok(None);
        };
        self.builder()?.describe(die).map(Some)
    }

    /// Address and type name of the global variable `name`.
    ///
    /// ## Errors
    ///
    /// Returns `Dwarf` if the debug info is malformed.
    pub fn find_global(&self, name: &str) -> Result<Option<GlobalVariable>>
    {
        let Some(die) = self.index()?.find_global(name) else {
            return Ok(None);
        };
        self.builder()?.global(name, die)
    }

    /// Names of all indexed types, sorted.
    ///
    /// ## Errors
    ///
    /// Returns `Dwarf` if the debug info can't be indexed.
    pub fn type_names(&self) -> Result<Vec<String>>
    {
        let mut names: Vec<String> = self.index()?.type_names().map(str::to_string).collect();
        names.sort();
        Ok(names)
    }
}

impl TypeSource for BinaryImage
{
    fn resolve_type(&self, name: &str) -> Result<Option<TypeDescriptor>>
    {
        Ok(self.describe_type(name)?.map(|ty| (*ty).clone()))
    }

    fn pointer_size(&self) -> u64
    {
        self.pointer_size
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_rejects_non_object_bytes()
    {
        let err = BinaryImage::parse(Path::new("junk"), b"definitely not an object file").unwrap_err();
        assert!(matches!(err, FormatterError::InvalidArgument(_)), "{err}");
    }

    #[test]
    fn test_missing_file_is_io_error()
    {
        let err = BinaryImage::open("/nonexistent/prism/binary").unwrap_err();
        assert!(matches!(err, FormatterError::Io(_)), "{err}");
    }

    #[allow(dead_code)]
    #[repr(C)]
    struct LayoutFixture
    {
        small: u32,
        wide: u64,
        tail: u16,
    }

    #[allow(dead_code)]
    #[repr(C)]
    struct Wrapper<T>
    {
        inner: T,
    }

    static LAYOUT_FIRST: LayoutFixture = LayoutFixture {
        small: 1,
        wide: 2,
        tail: 3,
    };
    static LAYOUT_SECOND: LayoutFixture = LayoutFixture {
        small: 4,
        wide: 5,
        tail: 6,
    };
    static WRAPPED: Wrapper<u32> = Wrapper { inner: 7 };

    const FIXTURE_SCOPE: &str = "prism_core::symbols::image::tests";

    /// Debug info of the running test binary, when it carries any.
    fn own_image() -> Option<BinaryImage>
    {
        let image = BinaryImage::open(std::env::current_exe().ok()?).ok()?;
        image.has_debug_info().then_some(image)
    }

    #[test]
    fn test_own_struct_layout()
    {
        std::hint::black_box((&LAYOUT_FIRST, &LAYOUT_SECOND, &WRAPPED));
        let Some(image) = own_image() else {
            return;
        };

        let ty = image
            .describe_type(&format!("{FIXTURE_SCOPE}::LayoutFixture"))
            .unwrap()
            .expect("fixture struct is in the debug info");
        assert_eq!(ty.byte_size(), std::mem::size_of::<LayoutFixture>() as u64);
        let fields: Vec<(&str, u64, &str)> = ty
            .canonical()
            .fields()
            .iter()
            .map(|field| (field.name.as_str(), field.offset, field.ty.name()))
            .collect();
        assert_eq!(fields, vec![("small", 0, "u32"), ("wide", 8, "u64"), ("tail", 16, "u16")]);
        assert!(ty.canonical().fields().iter().all(|field| !field.is_base));

        let wrapper = image
            .describe_type(&format!("{FIXTURE_SCOPE}::Wrapper<u32>"))
            .unwrap()
            .expect("generic fixture is in the debug info");
        assert_eq!(wrapper.template_type_arg(0), Some("u32"));
        assert_eq!(wrapper.canonical().field("inner").map(|field| field.offset), Some(0));
    }

    #[test]
    fn test_own_globals()
    {
        std::hint::black_box((&LAYOUT_FIRST, &LAYOUT_SECOND));
        let Some(image) = own_image() else {
            return;
        };

        let first = image
            .find_global(&format!("{FIXTURE_SCOPE}::LAYOUT_FIRST"))
            .unwrap()
            .expect("static is in the debug info");
        let second = image
            .find_global(&format!("{FIXTURE_SCOPE}::LAYOUT_SECOND"))
            .unwrap()
            .expect("static is in the debug info");
        assert!(first.type_name.ends_with("LayoutFixture"), "{}", first.type_name);
        assert!(!first.address.is_null());

        // Link-time addresses differ from runtime ones by the load bias only.
        let runtime_first = std::ptr::addr_of!(LAYOUT_FIRST) as usize as i128;
        let runtime = std::ptr::addr_of!(LAYOUT_SECOND) as usize as i128 - runtime_first;
        let linked = i128::from(second.address.value()) - i128::from(first.address.value());
        assert_eq!(linked, runtime);
    }

    #[test]
    fn test_own_executable_without_panicking()
    {
        // The test binary may or may not carry debug info; either way lookups
        // must come back cleanly.
        let Ok(exe) = std::env::current_exe() else {
            return;
        };
        let Ok(image) = BinaryImage::open(&exe) else {
            return;
        };
        assert!(image.pointer_size == 4 || image.pointer_size == 8);
        if image.has_debug_info() {
            let _ = image.describe_type("no::such::Type");
            let _ = image.find_global("no_such_global");
        }
    }
}
