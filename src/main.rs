extern crate ubem_template;

use clap::{Args, Parser};
use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::info;
use ubem_template::output::{write_profile, write_template, FileOutput};
use ubem_template::report::WideTable;
use ubem_template::{
    build_template, collect_report_data, CorePerimeterClassifier, ProfileOptions,
    ScheduleLibrary, SimulationResults, UmiTemplate,
};

#[derive(Parser, Default, Debug)]
#[clap(author, version, about, long_about = None)]
struct TemplateArgs {
    /// Raw simulation results, one result object per archetype.
    results_file: PathBuf,
    #[arg(long, short, default_value = "template")]
    name: String,
    #[arg(long, short, default_value = ".")]
    out_dir: PathBuf,
    /// Existing template document to reuse the schedule objects from.
    #[arg(long)]
    schedule_library: Option<PathBuf>,
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
    #[command(flatten)]
    profile: ProfileExport,
}

#[derive(Args, Clone, Default, Debug)]
struct ProfileExport {
    /// Also export the heating load series as CSV.
    #[arg(long, default_value_t = false)]
    heating_profile: bool,
    #[arg(long, default_value_t = false)]
    sort: bool,
    #[arg(long, default_value_t = false)]
    normalize: bool,
    /// Discretize the exported series into this many constant segments.
    #[arg(long)]
    bins: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    let args = TemplateArgs::parse();

    let subscriber = tracing_subscriber::fmt::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let results: SimulationResults =
        serde_json::from_reader(BufReader::new(File::open(&args.results_file)?))?;

    let schedules = match &args.schedule_library {
        Some(path) => {
            let library = UmiTemplate::from_json("library", &fs::read_to_string(path)?)?;
            ScheduleLibrary {
                day_schedules: library.collections.day_schedules,
                week_schedules: library.collections.week_schedules,
                year_schedules: library.collections.year_schedules,
            }
        }
        None => ScheduleLibrary::default(),
    };

    let template = build_template(
        &args.name,
        &results,
        &CorePerimeterClassifier,
        &schedules,
        &WideTable::default(),
    )?;
    let output = FileOutput::new(args.out_dir.clone(), "{}.json".to_string());
    write_template(&output, &template)?;
    info!(
        "wrote template {:?} with {} building templates",
        args.name,
        template.collections.building_templates.len()
    );

    if args.profile.heating_profile {
        let report = collect_report_data(&results)?;
        let options = ProfileOptions {
            sort: args.profile.sort,
            normalize: args.profile.normalize,
            ..ProfileOptions::default()
        };
        let mut profile = report.heating_load(&options)?;
        if let Some(bins) = args.profile.bins {
            profile.discretize(bins)?;
        }
        let output = FileOutput::new(args.out_dir, "{}.csv".to_string());
        write_profile(&output, "heating_load", &profile)?;
        info!("wrote heating load profile");
    }

    Ok(())
}
