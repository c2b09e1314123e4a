//! CLI argument parsing with clap.

use clap::Parser;

use crate::params::MAX_REFERENCE_IMAGES;

/// Generate and edit images through the fal queue API.
#[derive(Parser, Debug)]
#[command(name = "bananagen", version, about)]
pub struct Cli {
    /// Text prompt describing the desired image.
    #[arg(conflicts_with = "prompt_file")]
    pub prompt: Option<String>,

    /// Path to a file containing the prompt text.
    #[arg(short = 'p', long, conflicts_with = "prompt")]
    pub prompt_file: Option<String>,

    /// Model id or short alias (default from config).
    #[arg(short, long)]
    pub model: Option<String>,

    /// Number of images to generate, 1-4.
    #[arg(short = 'n', long)]
    pub num_images: Option<u32>,

    /// Aspect ratio (e.g., 1:1, 16:9, 9:16).
    #[arg(short, long)]
    pub aspect_ratio: Option<String>,

    /// Resolution: 1K, 2K, 4K.
    #[arg(short, long)]
    pub resolution: Option<String>,

    /// Output format: jpeg, png, webp.
    #[arg(short, long)]
    pub format: Option<String>,

    /// Reference image: URL, data URI, or local file. Switches to edit mode.
    #[arg(short = 'i', long = "image", value_name = "IMAGE")]
    pub images: Vec<String>,

    /// Download the generated images into this directory.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<String>,

    /// Fail instead of sending a reference image inline when every upload fails.
    #[arg(long)]
    pub no_inline_fallback: bool,

    /// Config file path override.
    #[arg(long)]
    pub config: Option<String>,

    /// Verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Resolve the prompt from either the positional argument or the file flag.
    ///
    /// # Errors
    ///
    /// Returns an error if neither prompt nor prompt-file is provided,
    /// or if the file cannot be read.
    pub fn resolve_prompt(&self) -> Result<String, std::io::Error> {
        let prompt = if let Some(ref text) = self.prompt {
            text.clone()
        } else if let Some(ref path) = self.prompt_file {
            std::fs::read_to_string(path)?
        } else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Provide a prompt string or use -p/--prompt-file",
            ));
        };
        let prompt = prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Prompt is empty",
            ));
        }
        Ok(prompt)
    }

    /// Check the number of reference images.
    ///
    /// # Errors
    ///
    /// Returns an error if more than [`MAX_REFERENCE_IMAGES`] were given.
    pub fn check_image_count(&self) -> Result<(), String> {
        if self.images.len() > MAX_REFERENCE_IMAGES {
            Err(format!(
                "Too many reference images: {} (at most {MAX_REFERENCE_IMAGES})",
                self.images.len()
            ))
        } else {
            Ok(())
        }
    }
}
