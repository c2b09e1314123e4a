//! Bananagen - image generation and editing through the fal queue API.

mod adapters;
mod blob;
mod cancel;
mod cassette;
mod cli;
mod config;
mod context;
mod error;
mod job;
mod model;
mod output;
mod params;
mod ports;
mod references;
mod result;
mod upload;

use std::path::Path;
use std::process;

use clap::Parser;
use tracing::Level;

use crate::cancel::CancellationToken;
use crate::cli::Cli;
use crate::config::{Config, API_KEY_ENV};
use crate::context::{RecordingSession, ServiceContext};
use crate::error::GenError;
use crate::job::{JobClient, JobEvent, JobParams};
use crate::model::{queue_endpoint, resolve_model};
use crate::params::{validate_credential, AspectRatio, OutputFormat, Resolution};
use crate::references::{resolve_references, ReferenceImage, ResolvedReference};
use crate::result::JobOutcome;
use crate::upload::AssetUploader;

/// Credential used when replaying a cassette without a configured key.
const REPLAY_CREDENTIAL: &str = "fal-replay";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), GenError> {
    // Load config
    let config_path = config::discover_config_path(cli.config.as_deref());
    let config = Config::load(&config_path).map_err(GenError::Config)?;

    // Resolve prompt
    let prompt = cli
        .resolve_prompt()
        .map_err(|e| GenError::InvalidArgument(e.to_string()))?;
    cli.check_image_count().map_err(GenError::InvalidArgument)?;

    // Resolve model and endpoint
    let model_arg = cli.model.as_deref().unwrap_or(&config.defaults.model);
    let model = resolve_model(model_arg);
    let endpoint =
        queue_endpoint(&config.queue.base_url, &model).map_err(GenError::InvalidArgument)?;

    // Validate parameters, CLI flags first, then config defaults
    let mut params = JobParams::new(prompt);
    params.num_images = cli.num_images.unwrap_or(config.defaults.num_images);
    let defaults = &config.defaults;
    params.aspect_ratio =
        parse_param::<AspectRatio>(cli.aspect_ratio.as_deref(), &defaults.aspect_ratio)?;
    params.resolution =
        parse_param::<Resolution>(cli.resolution.as_deref(), &defaults.resolution)?;
    params.output_format =
        parse_param::<OutputFormat>(cli.format.as_deref(), &defaults.output_format)?;
    params.validate()?;

    if cli.verbose {
        eprintln!("Model: {model} (resolved from '{model_arg}')");
        eprintln!("Endpoint: {endpoint}");
    }

    // Create context based on mode (live / recording / replaying)
    let replay_path = std::env::var("BANANAGEN_REPLAY").ok();
    let is_recording = std::env::var("BANANAGEN_REC").is_ok_and(|v| v == "true" || v == "1");

    let credential = match (config.api_key(), &replay_path) {
        (Some(key), _) => key,
        (None, Some(_)) => REPLAY_CREDENTIAL.to_string(),
        (None, None) => {
            return Err(GenError::MissingApiKey {
                env_var: API_KEY_ENV.into(),
            })
        }
    };
    validate_credential(&credential).map_err(GenError::InvalidArgument)?;

    let (ctx, recording_session): (ServiceContext, Option<RecordingSession>) =
        if let Some(ref cassette_path) = replay_path {
            if cli.verbose {
                eprintln!("Replaying from: {cassette_path}");
            }
            (ServiceContext::replaying(Path::new(cassette_path))?, None)
        } else if is_recording {
            if cli.verbose {
                eprintln!("Recording mode enabled");
            }
            let (ctx, session) = ServiceContext::recording();
            (ctx, Some(session))
        } else {
            (ServiceContext::live(), None)
        };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let format = params.output_format;
    let outcome = generate(&ctx, &config, &cli, &endpoint, &credential, params, &cancel).await;
    let saved = match &outcome {
        Ok(outcome) => render(&ctx, outcome, &cli, format).await,
        Err(_) => Ok(()),
    };
    drop(ctx);

    // Finish recording even when the job failed
    if let Some(session) = recording_session {
        match session.finish() {
            Ok(path) => eprintln!("Cassette saved: {}", path.display()),
            Err(e) => eprintln!("Warning: failed to save cassette: {e}"),
        }
    }

    outcome.and(saved)
}

async fn generate(
    ctx: &ServiceContext,
    config: &Config,
    cli: &Cli,
    endpoint: &str,
    credential: &str,
    mut params: JobParams,
    cancel: &CancellationToken,
) -> Result<JobOutcome, GenError> {
    if !cli.images.is_empty() {
        let uploader = AssetUploader::new(ctx.transport.clone(), config.upload.candidates());
        let references: Vec<ReferenceImage> = cli
            .images
            .iter()
            .map(|arg| ReferenceImage::parse(arg))
            .collect();
        let inline_fallback = !cli.no_inline_fallback;
        let resolved =
            resolve_references(&uploader, credential, &references, inline_fallback, cancel)
                .await?;

        let inline = resolved
            .iter()
            .filter(|r| matches!(r, ResolvedReference::Inline(_)))
            .count();
        if inline > 0 {
            eprintln!(
                "Upload failed for {inline} reference image(s); sending inline"
            );
        }
        params.reference_image_urls = resolved
            .into_iter()
            .map(ResolvedReference::into_url)
            .collect();
    }

    let client = JobClient::new(ctx.transport.clone(), endpoint, config.polling.policy());
    eprintln!("Generating {} image(s)...", params.num_images);
    client
        .submit(credential, &params, cancel, |event| match event {
            JobEvent::Submitted { request_id } => eprintln!("Submitted: {request_id}"),
            JobEvent::Queued {
                position: Some(position),
            } => eprintln!("Queued (position {position})"),
            JobEvent::Queued { position: None } => eprintln!("Queued"),
            JobEvent::Progress { message } => eprintln!("{message}"),
        })
        .await
}

async fn render(
    ctx: &ServiceContext,
    outcome: &JobOutcome,
    cli: &Cli,
    format: OutputFormat,
) -> Result<(), GenError> {
    if outcome.is_empty() {
        eprintln!("{}", output::EMPTY_RESULT_MESSAGE);
        return Ok(());
    }
    if let Some(description) = &outcome.description {
        eprintln!("{description}");
    }

    output::print_urls(outcome);
    if let Some(dir) = &cli.output_dir {
        let paths =
            output::save_all(ctx.transport.as_ref(), outcome, Path::new(dir), format).await?;
        for path in paths {
            eprintln!("Saved: {}", path.display());
        }
    }
    Ok(())
}

fn parse_param<T>(flag: Option<&str>, default: &str) -> Result<T, GenError>
where
    T: std::str::FromStr<Err = String>,
{
    flag.unwrap_or(default).parse().map_err(GenError::InvalidArgument)
}
