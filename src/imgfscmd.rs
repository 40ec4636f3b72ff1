//! imgfscmd — command-line front-end for imgFS stores.

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use imgfs::error::{ImgfsError, Result};
use imgfs::metadata::Resolution;
use imgfs::store::{
    valid_img_id, CreateOptions, ImgFs, ListMode, DEFAULT_MAX_FILES, DEFAULT_SMALL_RES,
    DEFAULT_THUMB_RES,
};

#[derive(Parser)]
#[command(name = "imgfscmd", version, about = "The imgFS command line interpreter")]
#[command(disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display this help
    Help,
    /// List imgFS content
    List {
        imgfs_filename: PathBuf,
    },
    /// Create a new imgFS
    Create {
        imgfs_filename: PathBuf,
        /// Maximum number of images (default 128)
        #[arg(long, default_value_t = DEFAULT_MAX_FILES)]
        max_files: u32,
        /// Thumbnail resolution, e.g. --thumb-res 64 64 (max 128x128)
        #[arg(long, num_args = 2, value_names = ["X_RES", "Y_RES"])]
        thumb_res: Option<Vec<u16>>,
        /// Small resolution, e.g. --small-res 256 256 (max 512x512)
        #[arg(long, num_args = 2, value_names = ["X_RES", "Y_RES"])]
        small_res: Option<Vec<u16>>,
    },
    /// Read an image from the imgFS and save it to a file
    Read {
        imgfs_filename: PathBuf,
        img_id: String,
        /// One of thumb|thumbnail|small|orig|original (default original)
        resolution: Option<String>,
    },
    /// Insert a new image into the imgFS
    Insert {
        imgfs_filename: PathBuf,
        img_id: String,
        filename: PathBuf,
    },
    /// Delete an image from the imgFS
    Delete {
        imgfs_filename: PathBuf,
        img_id: String,
    },
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Help => {
            print_usage();
            Ok(())
        }

        Commands::List { imgfs_filename } => {
            let store = ImgFs::open(&imgfs_filename, "rb")?;
            store.list(ListMode::Stdout)?;
            Ok(())
        }

        Commands::Create { imgfs_filename, max_files, thumb_res, small_res } => {
            let opts = CreateOptions {
                max_files,
                thumb_res: pair_or(thumb_res, DEFAULT_THUMB_RES)?,
                small_res: pair_or(small_res, DEFAULT_SMALL_RES)?,
            };
            ImgFs::create(&imgfs_filename, &opts)?;
            Ok(())
        }

        Commands::Read { imgfs_filename, img_id, resolution } => {
            let resolution = match resolution.as_deref() {
                Some(name) => Resolution::from_name(name).ok_or(ImgfsError::Resolutions)?,
                None => Resolution::Orig,
            };
            if !valid_img_id(&img_id) {
                return Err(ImgfsError::InvalidImgId);
            }

            // "r+b": the first read of a derived resolution appends to the
            // store.
            let mut store = ImgFs::open(&imgfs_filename, "r+b")?;
            let image = store.read(&img_id, resolution)?;

            let out_name = format!("{img_id}_{}.jpg", resolution.suffix());
            std::fs::write(&out_name, &image)?;
            Ok(())
        }

        Commands::Insert { imgfs_filename, img_id, filename } => {
            if !valid_img_id(&img_id) {
                return Err(ImgfsError::InvalidImgId);
            }
            let image = std::fs::read(&filename)?;

            let mut store = ImgFs::open(&imgfs_filename, "r+b")?;
            store.insert(&image, &img_id)
        }

        Commands::Delete { imgfs_filename, img_id } => {
            if !valid_img_id(&img_id) {
                return Err(ImgfsError::InvalidImgId);
            }
            let mut store = ImgFs::open(&imgfs_filename, "r+b")?;
            store.delete(&img_id)
        }
    }
}

/// Turn an optional `[w, h]` pair into a tuple, defaulting both dimensions.
/// Range checks happen in `CreateOptions::validate`.
fn pair_or(values: Option<Vec<u16>>, default: u16) -> Result<(u16, u16)> {
    match values {
        None => Ok((default, default)),
        Some(v) if v.len() == 2 => Ok((v[0], v[1])),
        Some(_) => Err(ImgfsError::NotEnoughArguments),
    }
}

fn print_usage() {
    let _ = Cli::command().print_long_help();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {e}");
            print_usage();
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
