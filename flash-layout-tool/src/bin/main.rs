use std::path::PathBuf;
use std::process::ExitCode;

use clap::{
    Parser,
    Subcommand,
};
use flash_layout::RegionHash;
use flash_layout_tool::{
    add_layout_table,
    Error,
    Firmware,
    MemoryImage,
    SymbolMap,
    NRF_PAGE_SIZE_LOG2,
};

#[derive(Parser)]
#[command(name = "flash-layout-tool")]
#[command(about = "Add a flash layout table to MicroPython hex firmware for the micro:bit", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add the flash layout table to a hex firmware
    Generate {
        /// Input MicroPython firmware (Intel HEX)
        firmware: PathBuf,

        /// Input linker map file of the firmware
        mapfile: PathBuf,

        /// Output hex file path (default is stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Native page size of the flash, log-2
        #[arg(long, default_value_t = NRF_PAGE_SIZE_LOG2)]
        page_size_log2: u16,
    },
    /// Locate the flash layout table in a hex firmware and print it
    Inspect {
        /// Input firmware (Intel HEX)
        firmware: PathBuf,

        /// Native page size of the flash, log-2
        #[arg(long, default_value_t = NRF_PAGE_SIZE_LOG2)]
        page_size_log2: u16,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), Error> {
    match command {
        Commands::Generate {
            firmware,
            mapfile,
            output,
            page_size_log2,
        } => {
            let input = Firmware::from_hex_file(&firmware)?;
            let map = SymbolMap::from_map_file(&mapfile)?;
            let (plan, patched) = add_layout_table(&input, &map, page_size_log2)?;

            match output {
                // stdout carries the firmware, nothing else may be printed
                None => patched.write_to(std::io::stdout().lock()),
                Some(output) => {
                    print!("{plan}");
                    patched.to_hex_file(&output)?;
                    println!("Successfully wrote firmware: {}", output.display());
                    Ok(())
                }
            }
        }
        Commands::Inspect {
            firmware,
            page_size_log2,
        } => {
            println!("Parsing hex file: {}", firmware.display());
            let firmware = Firmware::from_hex_file(&firmware)?;
            let image = firmware.memory_image()?;
            println!("Found {} bytes of data", image.len());

            let page_size = 1usize
                .checked_shl(u32::from(page_size_log2))
                .ok_or(flash_layout::Error::InvalidPageSize)?;
            let Some((address, table)) = firmware.find_layout_table(page_size)? else {
                println!("No flash layout table found");
                return Ok(());
            };

            let header = table.header();
            println!(
                "{:13} 0x{:05x}..0x{:05x}",
                "Layout table",
                address,
                address as usize + table.len()
            );
            println!(
                "Version {}, {} regions, page size {}",
                header.version,
                header.num_regions,
                header.page_size()
            );

            for region in table.regions() {
                let start = region.start_address(header.page_size_log2);
                println!(
                    "Region {:<3}   0x{:05x}..0x{:05x} {}",
                    region.id,
                    start,
                    u64::from(start) + u64::from(region.length),
                    describe_hash(&region.hash, &image)
                );
            }

            Ok(())
        }
    }
}

fn describe_hash(hash: &RegionHash, image: &MemoryImage) -> String {
    match hash {
        RegionHash::None => "NONE".to_string(),
        RegionHash::Data(data) => format!("DATA {}", hex::encode(data)),
        RegionHash::Ptr(address) => match image.read_c_string(*address) {
            Some(string) => format!("PTR 0x{address:05x} {string:?}"),
            None => format!("PTR 0x{address:05x}"),
        },
    }
}
