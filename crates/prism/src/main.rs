mod demo;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use prism_core::memory::{CoreFileMemory, MemorySource};
use prism_core::render::{render, RenderOptions};
use prism_core::symbols::BinaryImage;
use prism_core::types::{Address, TypeCatalog, TypeSource};
use prism_core::{DisplaySettings, FormatterError, FormatterRegistry, Result, Target, ValueHandle};
use prism_utils::{debug, init_logging};

use crate::demo::DemoLibrary;

/// Render debugger values through data formatters without running target code.
#[derive(Parser, Debug)]
#[command(name = "prism")]
#[command(version)]
#[command(about = "Render debugger values through data formatters without running target code", long_about = None)]
struct Cli
{
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// List formatter categories and whether they are enabled
    Categories,
    /// Print the layout of a type from a binary's debug info
    Layout
    {
        /// Executable or shared library with DWARF
        #[arg(long)]
        binary: PathBuf,
        /// Fully qualified type name (e.g. `std::__1::atomic<int>`)
        #[arg(long = "type")]
        type_name: String,
    },
    /// Render a variable from a live process or a core file
    Show
    {
        /// Executable or shared library with DWARF
        #[arg(long)]
        binary: PathBuf,
        /// Read memory from this stopped process
        #[arg(long, conflicts_with = "core")]
        pid: Option<i32>,
        /// Read memory from this ELF core file
        #[arg(long)]
        core: Option<PathBuf>,
        /// Global variable to show
        #[arg(long, conflicts_with_all = ["address", "type_name"])]
        global: Option<String>,
        /// Address of the value (hex with `0x`, or decimal)
        #[arg(long, requires = "type_name", value_parser = parse_address)]
        address: Option<Address>,
        /// Type of the value at `--address`
        #[arg(long = "type", requires = "address")]
        type_name: Option<String>,
        #[command(flatten)]
        display: DisplayArgs,
    },
    /// Render the built-in atomic snapshot (`s`, `i`, `p`)
    Demo
    {
        /// Standard library layout to emulate (`libcxx` or `msvcstl`)
        #[arg(long, default_value = "libcxx")]
        library: DemoLibrary,
        /// Only show this variable
        #[arg(long)]
        variable: Option<String>,
        #[command(flatten)]
        display: DisplayArgs,
    },
}

#[derive(Args, Debug, Default)]
struct DisplayArgs
{
    /// Member path below the variable (`child.parent`, `items[2]`)
    #[arg(long)]
    path: Option<String>,
    /// Pointer levels to follow
    #[arg(long)]
    ptr_depth: Option<usize>,
    /// Render `{ a = 1, b = 2 }` on one line
    #[arg(long, default_value_t = false)]
    one_line: bool,
    /// Show raw members instead of synthetic children
    #[arg(long, default_value_t = false)]
    raw: bool,
    /// Enable a formatter category (repeatable)
    #[arg(long = "enable")]
    enable: Vec<String>,
    /// Disable a formatter category (repeatable)
    #[arg(long = "disable")]
    disable: Vec<String>,
}

impl DisplayArgs
{
    fn settings(&self) -> DisplaySettings
    {
        let mut settings = DisplaySettings::from_env();
        if let Some(depth) = self.ptr_depth {
            settings.ptr_depth = depth;
        }
        if self.raw {
            settings.prefer_synthetic = false;
        }
        settings
    }

    fn registry(&self, settings: &DisplaySettings) -> Result<Arc<FormatterRegistry>>
    {
        let registry = FormatterRegistry::with_builtin();
        settings.apply_categories(&registry)?;
        for category in &self.enable {
            registry.set_category_enabled(category, true)?;
        }
        for category in &self.disable {
            registry.set_category_enabled(category, false)?;
        }
        Ok(Arc::new(registry))
    }

    fn options(&self, settings: &DisplaySettings) -> RenderOptions
    {
        let options = RenderOptions::from_settings(settings);
        if self.one_line {
            options.one_line()
        } else {
            options
        }
    }

    /// Print `root`, or the member at `--path` below it.
    fn print(&self, root: &ValueHandle, options: &RenderOptions) -> Result<()>
    {
        let value = match &self.path {
            Some(path) => root.value_for_path(path)?,
            None => root.clone(),
        };
        print!("{}", render(&value, options));
        Ok(())
    }
}

fn parse_address(text: &str) -> std::result::Result<Address, String>
{
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => text.parse::<u64>(),
    };
    parsed
        .map(Address::new)
        .map_err(|err| format!("invalid address `{text}`: {err}"))
}

fn main()
{
    let _guard = match init_logging() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    let cli = Cli::parse();
    if let Err(e) = run_command(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(cli: Cli) -> Result<()>
{
    match cli.command {
        Commands::Categories => {
            let registry = FormatterRegistry::with_builtin();
            DisplaySettings::from_env().apply_categories(&registry)?;
            for category in registry.categories() {
                println!(
                    "{:<12} {:<8} priority {:>3}  {} formatter(s)",
                    category.name(),
                    if category.is_enabled() { "enabled" } else { "disabled" },
                    category.priority(),
                    category.entries().len()
                );
                for entry in category.entries() {
                    println!("    {} ({})", entry.pattern(), entry.formatter().kind());
                }
            }
            Ok(())
        }
        Commands::Layout { binary, type_name } => {
            let image = BinaryImage::open(&binary)?;
            let catalog = TypeCatalog::with_source(binary.display().to_string(), Arc::new(image));
            let ty = catalog.resolve(&type_name)?;
            println!("{} ({} bytes)", ty.name(), ty.byte_size());
            for field in ty.canonical().fields() {
                let role = if field.is_base { "base" } else { "member" };
                println!(
                    "  +{:<4} {:<6} {} : {} ({} bytes)",
                    field.offset,
                    role,
                    field.name,
                    field.ty.name(),
                    field.ty.byte_size()
                );
            }
            for layout in prism_core::formatters::AtomicLayout::ALL {
                if let Some((offset, storage)) = layout.locate_storage(&ty) {
                    println!("  {} storage: +{offset} {}", layout.category(), storage.name());
                }
            }
            Ok(())
        }
        Commands::Show {
            binary,
            pid,
            core,
            global,
            address,
            type_name,
            display,
        } => {
            let image = Arc::new(BinaryImage::open(&binary)?);
            let memory = open_memory(pid, core)?;
            debug!(memory = %memory.describe(), "opened memory source");

            let (name, address, type_name) = match (global, address, type_name) {
                (Some(global), _, _) => {
                    let variable = image.find_global(&global)?.ok_or_else(|| {
                        FormatterError::InvalidArgument(format!("no global variable named `{global}` with a static address"))
                    })?;
                    (variable.name, variable.address, variable.type_name)
                }
                (None, Some(address), Some(type_name)) => (address.to_string(), address, type_name),
                _ => {
                    return Err(FormatterError::InvalidArgument(
                        "pass --global, or --address with --type".to_string(),
                    ))
                }
            };

            let settings = display.settings();
            let registry = display.registry(&settings)?;
            let byte_order = image.byte_order();
            let source: Arc<dyn TypeSource> = image;
            let catalog = Arc::new(TypeCatalog::with_source(binary.display().to_string(), source));
            let target = Arc::new(
                Target::new(memory, catalog, registry)
                    .with_settings(settings.clone())
                    .with_byte_order(byte_order),
            );
            let root = target.value_at(&name, address, &type_name)?;
            display.print(&root, &display.options(&settings))
        }
        Commands::Demo {
            library,
            variable,
            display,
        } => {
            let demo = demo::build(library)?;
            let settings = display.settings();
            let registry = display.registry(&settings)?;
            let options = display.options(&settings);
            let target = Arc::new(
                Target::new(Arc::new(demo.memory), Arc::new(demo.catalog), registry).with_settings(settings),
            );

            for var in &demo.variables {
                if variable.as_deref().is_some_and(|wanted| wanted != var.name) {
                    continue;
                }
                let root = target.value_at(var.name, var.address, &var.type_name)?;
                display.print(&root, &options)?;
            }
            Ok(())
        }
    }
}

fn open_memory(pid: Option<i32>, core: Option<PathBuf>) -> Result<Arc<dyn MemorySource>>
{
    if let Some(core) = core {
        return Ok(Arc::new(CoreFileMemory::open(core)?));
    }
    match pid {
        #[cfg(target_os = "linux")]
        Some(pid) => Ok(Arc::new(prism_core::memory::ProcessMemory::new(pid))),
        #[cfg(not(target_os = "linux"))]
        Some(_) => Err(FormatterError::InvalidArgument(
            "--pid is only supported on Linux; use --core".to_string(),
        )),
        None => Err(FormatterError::InvalidArgument("pass --pid or --core".to_string())),
    }
}
