use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::sync::Arc;

use wardrobe_engine::{
    config::Config,
    db::{create_redis_client, Cache, CacheWriterHandle},
    models::GenerationMode,
    services::providers::{
        ChatCompletionProvider, JsonFileWardrobe, OpenWeatherProvider, StaticScheduleProvider,
    },
    telemetry, ContextResolver, DailyPlanner, OutfitEngine,
};

#[derive(Parser)]
#[command(name = "wardrobe-engine")]
#[command(about = "Daily outfit recommendations and wardrobe gap analysis")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Rank outfits for a day (today by default)
    Recommend {
        /// Target date as YYYY-MM-DD
        date: Option<NaiveDate>,
        /// Skip the generative model and enumerate combinations
        #[arg(long)]
        deterministic: bool,
    },
    /// Report what the wardrobe is missing
    Gaps,
}

async fn connect_cache(config: &Config) -> Option<(Cache, CacheWriterHandle)> {
    let url = config.redis_url.as_deref()?;
    let client = match create_redis_client(url) {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, "Invalid REDIS_URL, weather will not be cached");
            return None;
        }
    };

    let (cache, writer) = Cache::new(client).await;
    match cache.ping().await {
        Ok(()) => {
            tracing::info!("Weather cache enabled");
            Some((cache, writer))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Redis unavailable, weather will not be cached");
            drop(cache);
            writer.shutdown().await;
            None
        }
    }
}

async fn build_planner(config: &Config, cache: Option<&Cache>) -> anyhow::Result<DailyPlanner> {
    let mut context = ContextResolver::new()
        .with_timeouts(config.weather_timeout(), config.schedule_timeout());

    if let Some(api_key) = &config.weather_api_key {
        let mut provider = OpenWeatherProvider::new(
            api_key.clone(),
            config.weather_api_url.clone(),
            &config.weather_city,
            &config.weather_country,
        );
        if let Some(cache) = cache {
            provider = provider.with_cache(cache.clone());
        }
        context = context.with_weather(Arc::new(provider));
    } else {
        tracing::warn!("WEATHER_API_KEY not set, weather scoring is disabled");
    }

    let schedule = StaticScheduleProvider::from_json_file(&config.schedule_path)
        .await
        .with_context(|| format!("failed to load schedule from {}", config.schedule_path))?;
    context = context.with_schedule(Arc::new(schedule));

    let mut engine = OutfitEngine::new(config.engine_settings());
    if let Some(api_key) = &config.llm_api_key {
        let generator = ChatCompletionProvider::new(
            api_key.clone(),
            config.llm_api_url.clone(),
            config.llm_model.clone(),
        )?;
        engine = engine.with_generator(Arc::new(generator));
    }

    let wardrobe = JsonFileWardrobe::new(&config.wardrobe_path);
    Ok(DailyPlanner::new(Arc::new(wardrobe), context, engine))
}

async fn run(config: &Config, command: Command, cache: Option<&Cache>) -> anyhow::Result<String> {
    let planner = build_planner(config, cache).await?;

    let output = match command {
        Command::Recommend {
            date,
            deterministic,
        } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let mut options = config.recommendation_options();
            if deterministic {
                options.mode = GenerationMode::Deterministic;
            }
            let outcome = planner.plan(date, options).await?;
            serde_json::to_string_pretty(&outcome)?
        }
        Command::Gaps => {
            let report = planner.gaps().await?;
            serde_json::to_string_pretty(&report)?
        }
    };
    Ok(output)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let command = Cli::parse().command.unwrap_or(Command::Recommend {
        date: None,
        deterministic: false,
    });
    let config = Config::from_env()?;

    let cache = connect_cache(&config).await;
    let result = run(&config, command, cache.as_ref().map(|(cache, _)| cache)).await;

    if let Some((_, writer)) = cache {
        writer.shutdown().await;
    }

    println!("{}", result?);
    Ok(())
}
