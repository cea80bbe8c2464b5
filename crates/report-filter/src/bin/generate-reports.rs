//! Writes a consistent set of sample inputs for the report filter.
//!
//! Draws clients and services from fixed pools so the summary has repeated
//! services, spreads request times over the next 24 hours and draws counts
//! from triangular distributions skewed towards high values.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use report_core::models::{Report, ReportBuilder, ReportField, SourceFormat};
use report_core::time_utils::TimeCodec;
use report_data::writer::{write_markup, write_object_notation, write_tabular};

/// Generate sample report inputs
#[derive(Parser, Debug)]
#[command(name = "generate-reports", version)]
struct Args {
    /// Directory to write reports.csv, reports.xml and reports.json into
    #[arg(long, default_value = "./reports")]
    out_dir: PathBuf,

    /// Reports per input file
    #[arg(long, default_value = "300")]
    count: usize,

    /// Number of distinct services
    #[arg(long, default_value = "20", value_parser = clap::value_parser!(u32).range(1..))]
    services: u32,

    /// Number of distinct clients
    #[arg(long, default_value = "100", value_parser = clap::value_parser!(u32).range(1..))]
    clients: u32,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,
}

/// Source of sample reports.
struct Generator {
    rng: StdRng,
    services: Vec<String>,
    clients: Vec<(String, String)>,
    start_millis: i64,
}

impl Generator {
    fn new(mut rng: StdRng, services: u32, clients: u32, start_millis: i64) -> Self {
        let services = (0..services).map(|_| random_guid(&mut rng)).collect();
        let clients = (0..clients)
            .map(|_| {
                let address = format!(
                    "{}.{}.{}.{}",
                    rng.gen::<u8>(),
                    rng.gen::<u8>(),
                    rng.gen::<u8>(),
                    rng.gen::<u8>()
                );
                (address, random_guid(&mut rng))
            })
            .collect();
        Self {
            rng,
            services,
            clients,
            start_millis,
        }
    }

    /// One report with a request time inside the next 24 hours.
    ///
    /// `whole_seconds` drops the millisecond part, for formats that carry
    /// time as text.
    fn next_report(&mut self, codec: &TimeCodec, whole_seconds: bool) -> Result<Report> {
        let (address, client) = &self.clients[self.rng.gen_range(0..self.clients.len())];
        let service = &self.services[self.rng.gen_range(0..self.services.len())];

        let mut offset = self.rng.gen_range(0..=86_400_i64) * 1000;
        if !whole_seconds {
            offset += self.rng.gen_range(0..1000_i64);
        }

        let mut builder = ReportBuilder::new();
        builder.set_text(ReportField::ClientAddress, address, codec)?;
        builder.set_text(ReportField::ClientGuid, client, codec)?;
        builder.set_request_time(self.start_millis + offset)?;
        builder.set_text(ReportField::ServiceGuid, service, codec)?;
        builder.set_count(
            ReportField::RetriesRequest,
            triangular(&mut self.rng, 0.0, 10.0, 7.0),
        )?;
        for field in [
            ReportField::PacketsRequested,
            ReportField::PacketsServiced,
            ReportField::MaxHoleSize,
        ] {
            builder.set_count(field, triangular(&mut self.rng, 0.0, 20.0, 15.0))?;
        }
        Ok(builder.build()?)
    }

    fn batch(&mut self, count: usize, codec: &TimeCodec, whole_seconds: bool) -> Result<Vec<Report>> {
        (0..count)
            .map(|_| self.next_report(codec, whole_seconds))
            .collect()
    }
}

/// A version-4 GUID drawn from `rng`, so seeded runs are reproducible.
fn random_guid<R: Rng>(rng: &mut R) -> String {
    uuid::Builder::from_random_bytes(rng.gen())
        .into_uuid()
        .to_string()
}

/// Sample a triangular distribution on `[low, high]` with peak at `mode`,
/// truncated to an integer.
fn triangular<R: Rng>(rng: &mut R, low: f64, high: f64, mode: f64) -> u32 {
    let u: f64 = rng.gen();
    let split = (mode - low) / (high - low);
    let x = if u < split {
        low + ((high - low) * (mode - low) * u).sqrt()
    } else {
        high - ((high - low) * (high - mode) * (1.0 - u)).sqrt()
    };
    x as u32
}

fn create(dir: &Path, name: &str) -> Result<BufWriter<File>> {
    let path = dir.join(name);
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn main() -> Result<()> {
    let args = Args::parse();
    let codec = TimeCodec::new();

    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut generator = Generator::new(rng, args.services, args.clients, Utc::now().timestamp_millis());

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;

    for format in SourceFormat::ALL {
        match format {
            SourceFormat::Tabular => {
                let reports = generator.batch(args.count, &codec, true)?;
                write_tabular(create(&args.out_dir, "reports.csv")?, &reports, &codec)?;
            }
            SourceFormat::Markup => {
                let reports = generator.batch(args.count, &codec, true)?;
                write_markup(create(&args.out_dir, "reports.xml")?, &reports, &codec)?;
            }
            SourceFormat::ObjectNotation => {
                let reports = generator.batch(args.count, &codec, false)?;
                write_object_notation(create(&args.out_dir, "reports.json")?, &reports)?;
            }
        }
    }

    println!(
        "Wrote {} reports per format to {}",
        args.count,
        args.out_dir.display()
    );
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
