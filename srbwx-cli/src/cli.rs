use std::{sync::Arc, time::Duration};

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use inquire::Select;
use srbwx_core::{
    CANDIDATE_CITIES, City, Config, FetchStatus, ForecastOrchestrator, Lang, MapMount,
    OpenMeteoSource, Preferences, find_city,
    locate::{FixedGeolocator, use_my_location},
    search_cities,
    startup::{initial_city, should_auto_locate},
    store::{FileStore, KeyValueStore, MemoryStore},
    tiles::{HttpMapLibrary, MapLibrary},
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "srbwx",
    version,
    about = "Weather and air quality for Serbian cities"
)]
pub struct Cli {
    /// Log decisions (fetches, cancellations, fallbacks) to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the forecast for a city, or the last selected one.
    Show {
        /// City name, e.g. "Niš" or "Belgrade".
        city: Option<String>,
    },

    /// List known cities matching a query.
    Search {
        #[arg(default_value = "")]
        query: String,
    },

    /// Use a device position and show the forecast there.
    Locate {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },

    /// Pick a point as if clicked on the map and show its forecast.
    Pick {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },

    /// Show the map for the current city.
    Map {
        /// Tile zoom level; defaults to the configured zoom.
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=18))]
        zoom: Option<u8>,
    },

    /// Set display language ("sr" or "en").
    Lang { lang: String },

    /// Interactively choose language and city.
    Configure,
}

/// Everything a command needs, built once per invocation.
struct Session {
    config: Config,
    prefs: Preferences,
}

impl Session {
    fn load() -> anyhow::Result<Self> {
        let config = Config::load()?;

        let store: Arc<dyn KeyValueStore> = match FileStore::open_default() {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::warn!(error = %e, "no persistent store, selections are not kept");
                Arc::new(MemoryStore::default())
            }
        };

        Ok(Self {
            config,
            prefs: Preferences::new(store),
        })
    }

    fn lang(&self) -> Lang {
        self.prefs.lang_or(self.config.default_lang)
    }

    fn orchestrator(&self, initial: City) -> anyhow::Result<ForecastOrchestrator> {
        let source = OpenMeteoSource::from_config(&self.config)
            .context("Failed to create HTTP client for Open-Meteo")?;

        Ok(ForecastOrchestrator::with_options(
            Arc::new(source),
            self.prefs.clone(),
            initial,
            self.lang(),
            self.config.fetch_options(),
        ))
    }

    /// A map view settled on its renderer.
    async fn mount_map(&self, zoom: Option<u8>) -> MapMount {
        let library = HttpMapLibrary::new(&self.config.map_library_url);
        let zoom = zoom.unwrap_or(self.config.tile_zoom);

        mount_with(&library, zoom, self.config.map_load_timeout()).await
    }

    async fn show(&self, city: City) -> anyhow::Result<()> {
        let orch = self.orchestrator(city.clone())?;
        let state = orch.select_and_wait(city).await;

        match &state.status {
            FetchStatus::Ready(report) => {
                print!("{}", render::report(report, self.lang()));
                Ok(())
            }
            FetchStatus::Failed(e) => {
                let label = render::labels(self.lang()).error;
                Err(anyhow!("{label}: {e}"))
            }
            FetchStatus::Idle | FetchStatus::Loading => {
                Err(anyhow!("Forecast did not complete"))
            }
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let ctx = Session::load()?;

        match self.command {
            Command::Show { city } => {
                let city = match city {
                    Some(name) => find_city(&name).cloned().ok_or_else(|| {
                        anyhow!(
                            "Unknown city '{name}'.\n\
                             Hint: run `srbwx search {name}` to list matching cities."
                        )
                    })?,
                    None => {
                        if should_auto_locate(&ctx.prefs) {
                            eprintln!(
                                "Tip: run `srbwx locate --lat <LAT> --lon <LON>` \
                                 to use your position."
                            );
                        }
                        initial_city(&ctx.prefs)
                    }
                };
                ctx.show(city).await
            }
            Command::Search { query } => {
                let hits = search_cities(&query);
                if hits.is_empty() {
                    println!("No cities match '{query}'.");
                }
                for c in hits {
                    println!("{}", c.label());
                }
                Ok(())
            }
            Command::Locate { lat, lon } => {
                let geo = FixedGeolocator::at(lat, lon);
                let lang = ctx.lang();
                let options = ctx.config.geo_options();

                match use_my_location(&geo, &ctx.prefs, lang, &options).await {
                    Ok(city) => ctx.show(city).await,
                    Err(kind) => Err(anyhow!(kind.message(lang))),
                }
            }
            Command::Pick { lat, lon } => {
                let mount = ctx.mount_map(None).await;
                let city = picked_city(&mount, lat, lon)?;
                ctx.show(city).await
            }
            Command::Map { zoom } => {
                let city = initial_city(&ctx.prefs);
                let mount = ctx.mount_map(zoom).await;

                if let Some(view) = mount.render(&city) {
                    print!("{}", render::map(&city, &view));
                }
                Ok(())
            }
            Command::Lang { lang } => {
                let lang = Lang::try_from(lang.as_str())?;
                ctx.prefs.set_lang(lang);
                println!("Language set to {lang}.");
                Ok(())
            }
            Command::Configure => configure(ctx),
        }
    }
}

async fn mount_with(library: &dyn MapLibrary, zoom: u8, timeout: Duration) -> MapMount {
    let mut mount = MapMount::new(zoom);
    mount.resolve(library, timeout).await;
    mount
}

/// Clicks only exist on the interactive map; the static fallback has none.
fn picked_city(mount: &MapMount, lat: f64, lon: f64) -> anyhow::Result<City> {
    mount.click(lat, lon).ok_or_else(|| {
        anyhow!(
            "The interactive map is unavailable, so no point can be picked.\n\
             Hint: run `srbwx locate --lat {lat} --lon {lon}` instead."
        )
    })
}

fn configure(mut ctx: Session) -> anyhow::Result<()> {
    let lang = Select::new("Language:", vec![Lang::Sr, Lang::En])
        .with_starting_cursor(usize::from(ctx.lang() == Lang::En))
        .prompt()
        .context("Language selection cancelled")?;

    let labels: Vec<String> = CANDIDATE_CITIES.iter().map(City::label).collect();
    let choice = Select::new("City:", labels)
        .prompt()
        .context("City selection cancelled")?;

    let city = CANDIDATE_CITIES
        .iter()
        .find(|c| c.label() == choice)
        .cloned()
        .ok_or_else(|| anyhow!("Unknown city '{choice}'"))?;

    ctx.prefs.set_lang(lang);
    ctx.prefs.save_last_city(&city);

    ctx.config.default_lang = lang;
    ctx.config.save()?;

    println!("Saved: {} / {}", lang, city.label());
    Ok(())
}
