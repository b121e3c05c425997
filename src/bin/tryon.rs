//! CLI for tryon - virtual try-on photos.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tryon::presenter::{self, render, render_group, render_result};
use tryon::{
    Config, Ethnicity, GeminiModel, GeminiProvider, GenerateOutcome, GenerationState,
    IntakeSource, KeyGate, KeyStore, LoginOutcome, OptionGroup, PromptKeySelector, Scene, Session,
    Vibe,
};

#[derive(Parser)]
#[command(name = "tryon")]
#[command(about = "Generate a photo of a model wearing your garment (Gemini)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one try-on photo and save it
    Generate(GenerateArgs),

    /// List the available ethnicity, vibe and scene options
    Options,

    /// Interactive session with key selection, upload, options and download
    Studio(StudioArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// Photo of the clothing item (JPG, PNG or WebP)
    #[arg(short, long)]
    image: PathBuf,

    /// Ethnicity of the model
    #[arg(short, long, value_enum, default_value = "asian")]
    ethnicity: EthnicityArg,

    /// Style vibe of the model
    #[arg(long, value_enum, default_value = "cool")]
    vibe: VibeArg,

    /// Background scene
    #[arg(short, long, value_enum, default_value = "studio")]
    scene: SceneArg,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args)]
struct StudioArgs {
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args)]
struct CommonArgs {
    /// Directory the photo is saved to (defaults to TRYON_OUTPUT_DIR or .)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Gemini model (defaults to TRYON_MODEL or flash)
    #[arg(short, long, value_enum)]
    model: Option<ModelArg>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EthnicityArg {
    Asian,
    Caucasian,
    Black,
    Latino,
    MiddleEastern,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VibeArg {
    Cool,
    Energetic,
    Elegant,
    Casual,
    Professional,
    Vintage,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SceneArg {
    Studio,
    Street,
    Nature,
    Cafe,
    Beach,
    Future,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelArg {
    Flash,
    Pro,
}

impl From<EthnicityArg> for Ethnicity {
    fn from(arg: EthnicityArg) -> Self {
        match arg {
            EthnicityArg::Asian => Ethnicity::Asian,
            EthnicityArg::Caucasian => Ethnicity::Caucasian,
            EthnicityArg::Black => Ethnicity::Black,
            EthnicityArg::Latino => Ethnicity::Latino,
            EthnicityArg::MiddleEastern => Ethnicity::MiddleEastern,
        }
    }
}

impl From<VibeArg> for Vibe {
    fn from(arg: VibeArg) -> Self {
        match arg {
            VibeArg::Cool => Vibe::Cool,
            VibeArg::Energetic => Vibe::Energetic,
            VibeArg::Elegant => Vibe::Elegant,
            VibeArg::Casual => Vibe::Casual,
            VibeArg::Professional => Vibe::Professional,
            VibeArg::Vintage => Vibe::Vintage,
        }
    }
}

impl From<SceneArg> for Scene {
    fn from(arg: SceneArg) -> Self {
        match arg {
            SceneArg::Studio => Scene::Studio,
            SceneArg::Street => Scene::Street,
            SceneArg::Nature => Scene::Nature,
            SceneArg::Cafe => Scene::Cafe,
            SceneArg::Beach => Scene::Beach,
            SceneArg::Future => Scene::Future,
        }
    }
}

impl From<ModelArg> for GeminiModel {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Flash => GeminiModel::NanoBanana,
            ModelArg::Pro => GeminiModel::NanoBananaPro,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Generate(args) => {
            generate(args, cli.json).await?;
        }
        Commands::Options => {
            list_options(cli.json)?;
        }
        Commands::Studio(args) => {
            run_studio(args).await?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "tryon=debug" } else { "tryon=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &CommonArgs) -> anyhow::Result<Config> {
    if args.output_dir.is_none() && args.model.is_none() {
        return Ok(Config::from_env()?);
    }

    let mut builder = Config::builder();
    if let Some(dir) = &args.output_dir {
        builder = builder.output_dir(dir);
    }
    if let Some(model) = args.model {
        builder = builder.model(model.into());
    }
    Ok(builder.build()?)
}

fn build_provider(config: &Config, store: KeyStore) -> anyhow::Result<GeminiProvider> {
    if let Some(key) = &config.api_key {
        store.set(key.as_str());
    }
    Ok(GeminiProvider::builder()
        .key_store(store)
        .model(config.model)
        .build()?)
}

async fn generate(args: GenerateArgs, json_output: bool) -> anyhow::Result<()> {
    let config = load_config(&args.common)?;
    let provider = build_provider(&config, KeyStore::new())?;
    let session = Session::new(
        KeyGate::new(None, config.has_provisioned_key()),
        Arc::new(provider),
    );

    if !session.bootstrap().await {
        match session.login().await {
            LoginOutcome::Unavailable(message) => anyhow::bail!(message),
            LoginOutcome::Failed(message) => anyhow::bail!("login failed: {message}"),
            LoginOutcome::Selected => {}
        }
    }

    session.upload(IntakeSource::FilePicker(args.image)).await?;
    session.set_ethnicity(args.ethnicity.into());
    session.set_vibe(args.vibe.into());
    session.set_scene(args.scene.into());

    let options = session.options();
    let outcome = session.generate().await;

    let image = match session.state() {
        GenerationState::Ready(image) => image,
        GenerationState::Failed(message) => anyhow::bail!("generation failed: {message}"),
        _ => anyhow::bail!("generation did not complete ({outcome:?})"),
    };
    let path = presenter::download(&image, &config.output_dir)?;

    if json_output {
        let result = serde_json::json!({
            "success": true,
            "output": path.display().to_string(),
            "size_bytes": image.size(),
            "format": image.format.extension(),
            "options": options,
            "model": image.metadata.model,
            "duration_ms": image.metadata.duration_ms,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Generated try-on photo: {} ({} bytes) via {}",
            path.display(),
            image.size(),
            session.provider_name()
        );
        println!(
            "Model: {} / {} / {}",
            options.ethnicity, options.vibe, options.scene
        );
        if let Some(duration) = image.metadata.duration_ms {
            println!("Duration: {}ms", duration);
        }
    }

    Ok(())
}

fn list_options(json_output: bool) -> anyhow::Result<()> {
    #[derive(serde::Serialize)]
    struct OptionInfo {
        id: &'static str,
        label: &'static str,
        default: bool,
    }

    fn describe<T: OptionGroup>() -> Vec<OptionInfo> {
        T::variants()
            .iter()
            .enumerate()
            .map(|(i, v)| OptionInfo {
                id: v.as_str(),
                label: v.label(),
                default: i == 0,
            })
            .collect()
    }

    if json_output {
        let result = serde_json::json!({
            "ethnicity": describe::<Ethnicity>(),
            "vibe": describe::<Vibe>(),
            "scene": describe::<Scene>(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render_group(2, Ethnicity::default()));
        print!("{}", render_group(3, Vibe::default()));
        print!("{}", render_group(4, Scene::default()));
    }

    Ok(())
}

const STUDIO_HELP: &str = "\
Commands:
  upload <path>        pick a garment photo from disk
  drop <data-uri>      hand over an encoded image (data URI or base64)
  ethnicity <id>       choose the model's ethnicity
  vibe <id>            choose the style vibe
  scene <id>           choose the background scene
  generate             render the try-on photo
  download [dir]       save the photo as model-try-on.png
  status               show the whole workspace
  login                select a different API key
  help                 show this list
  quit                 leave the studio";

async fn run_studio(args: StudioArgs) -> anyhow::Result<()> {
    let config = load_config(&args.common)?;
    let store = KeyStore::new();
    let provider = build_provider(&config, store.clone())?;

    let input = Arc::new(Mutex::new(BufReader::new(tokio::io::stdin())));
    let selector = PromptKeySelector::with_shared_reader(input.clone(), store);
    let session = Session::new(
        KeyGate::new(Some(Arc::new(selector)), config.has_provisioned_key()),
        Arc::new(provider),
    );

    session.bootstrap().await;
    println!("{}\n", render(&session.view()));
    if session.is_unlocked() {
        println!("{STUDIO_HELP}");
    } else {
        println!("Type `login` to connect a key, or `quit`.");
    }

    loop {
        eprint!("> ");
        let mut line = String::new();
        if input.lock().await.read_line(&mut line).await? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (command, rest) = line
            .split_once(char::is_whitespace)
            .map(|(c, r)| (c, r.trim()))
            .unwrap_or((line, ""));

        match command {
            "quit" | "exit" => break,
            "help" => println!("{STUDIO_HELP}"),
            "login" => match session.login().await {
                LoginOutcome::Selected => {
                    println!("Key selected.\n\n{}", render(&session.view()))
                }
                LoginOutcome::Failed(message) => println!("Login failed: {message}"),
                LoginOutcome::Unavailable(message) => println!("{message}"),
            },
            _ if !session.is_unlocked() => {
                println!("Connect an API key first: type `login`.");
            }
            "upload" if rest.is_empty() => println!("Usage: upload <path>"),
            "upload" => match session
                .upload(IntakeSource::FilePicker(PathBuf::from(rest)))
                .await
            {
                Ok(()) => println!("Garment photo loaded. Run `generate` when ready."),
                Err(e) => println!("Could not use that photo: {e}"),
            },
            "drop" if rest.is_empty() => println!("Usage: drop <data-uri>"),
            "drop" => match session
                .upload(IntakeSource::Dropped {
                    name: "dropped image".into(),
                    payload: rest.to_string(),
                })
                .await
            {
                Ok(()) => println!("Garment photo loaded. Run `generate` when ready."),
                Err(e) => println!("Could not use that image: {e}"),
            },
            "ethnicity" => match rest.parse::<Ethnicity>() {
                Ok(value) => {
                    session.set_ethnicity(value);
                    print!("{}", render_group(2, value));
                }
                Err(e) => println!("{e}\n{}", render_group(2, session.options().ethnicity)),
            },
            "vibe" => match rest.parse::<Vibe>() {
                Ok(value) => {
                    session.set_vibe(value);
                    print!("{}", render_group(3, value));
                }
                Err(e) => println!("{e}\n{}", render_group(3, session.options().vibe)),
            },
            "scene" => match rest.parse::<Scene>() {
                Ok(value) => {
                    session.set_scene(value);
                    print!("{}", render_group(4, value));
                }
                Err(e) => println!("{e}\n{}", render_group(4, session.options().scene)),
            },
            "generate" => {
                println!("{}", render_result(&GenerationState::Pending));
                match session.generate().await {
                    GenerateOutcome::Reauthenticated => {
                        println!("The previous key was rejected; a new one is selected. Run `generate` again.")
                    }
                    GenerateOutcome::Abandoned => {}
                    _ => println!("{}", render_result(&session.state())),
                }
            }
            "download" => {
                let dir = if rest.is_empty() {
                    config.output_dir.clone()
                } else {
                    PathBuf::from(rest)
                };
                match session.state().result() {
                    Some(image) => match presenter::download(image, &dir) {
                        Ok(path) => println!("Saved {}", path.display()),
                        Err(e) => println!("Could not save the photo: {e}"),
                    },
                    None => println!("Nothing to download yet."),
                }
            }
            "status" => println!("{}", render(&session.view())),
            other => println!("Unknown command `{other}`. Type `help`."),
        }
    }

    Ok(())
}
