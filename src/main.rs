/// CLI для обучения и применения пайплайна признаков

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use feature_pipeline::{
    dataset::{load_csv, train_test_split, CsvOptions},
    persistence::{load_pipeline, save_pipeline},
    FeaturePipeline, PipelineConfig,
};

#[derive(Parser, Debug)]
#[command(name = "feature-pipeline", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Обучить пайплайн и сохранить его
    Train {
        /// CSV с обучающими данными
        #[arg(short, long)]
        data: PathBuf,

        /// Куда сохранить модель
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Предсказания для CSV
    Predict {
        /// Файл обученной модели
        #[arg(short, long)]
        model: PathBuf,

        #[arg(short, long)]
        data: PathBuf,

        /// CSV для предсказаний (по умолчанию stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[derive(clap::Args, Debug)]
struct ConfigArgs {
    /// JSON файл конфигурации
    #[arg(short, long, conflicts_with = "preset")]
    config: Option<PathBuf>,

    /// Встроенная конфигурация
    #[arg(long, value_enum)]
    preset: Option<Preset>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Preset {
    Titanic,
    HousePrices,
}

impl ConfigArgs {
    fn resolve(&self) -> Result<PipelineConfig> {
        match (&self.config, self.preset) {
            (Some(path), _) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("Failed to read config {}", path.display())),
            (None, Some(Preset::Titanic)) => Ok(PipelineConfig::titanic()),
            (None, Some(Preset::HousePrices)) => Ok(PipelineConfig::house_prices()),
            (None, None) => bail!("either --config or --preset is required"),
        }
    }
}

fn csv_options(config: &PipelineConfig) -> CsvOptions {
    CsvOptions::default()
        .with_categorical(&config.categorical_to_impute)
        .with_categorical(&config.first_letter)
        .with_categorical(&config.categorical_encode)
}

fn main() -> Result<()> {
    // Инициализация логирования
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Train { data, output, config } => train(&data, &output, config.resolve()?),
        Command::Predict {
            model,
            data,
            output,
            config,
        } => predict(&model, &data, output.as_deref(), config.resolve()?),
    }
}

fn train(data: &Path, output: &Path, config: PipelineConfig) -> Result<()> {
    let table = load_csv(data, &csv_options(&config))
        .with_context(|| format!("Failed to load {}", data.display()))?;
    let (features, target) = table.split_target(&config.target)?;
    let split = train_test_split(&features, &target, config.test_size, config.random_state)?;
    tracing::info!(
        "Train: {} rows, test: {} rows",
        split.x_train.n_rows(),
        split.x_test.n_rows()
    );

    let mut pipeline = FeaturePipeline::new(config)?;
    pipeline.fit(&split.x_train, &split.y_train)?;

    let evaluation = pipeline.evaluate(&split.x_test, &split.y_test)?;
    tracing::info!("Held-out {}", evaluation);

    save_pipeline(&pipeline, output)
        .with_context(|| format!("Failed to save model to {}", output.display()))?;
    Ok(())
}

fn predict(model: &Path, data: &Path, output: Option<&Path>, config: PipelineConfig) -> Result<()> {
    let options = csv_options(&config);
    let pipeline = load_pipeline(model, config)
        .with_context(|| format!("Failed to load model {}", model.display()))?;
    let table = load_csv(data, &options)
        .with_context(|| format!("Failed to load {}", data.display()))?;

    let predictions = pipeline.predict(&table)?;
    tracing::info!("Predicted {} rows", predictions.len());

    match output {
        Some(path) => {
            let mut writer = csv::Writer::from_path(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            writer.write_record(["prediction"])?;
            for p in predictions.iter() {
                writer.write_record([p.to_string()])?;
            }
            writer.flush()?;
        }
        None => {
            for p in predictions.iter() {
                println!("{}", p);
            }
        }
    }
    Ok(())
}
