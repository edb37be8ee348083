extern crate vskani;
use vskani::pipeline_argument_parsing::*;

extern crate clap;
use clap::*;

#[macro_use]
extern crate log;

extern crate bird_tool_utils;
use bird_tool_utils::clap_utils::*;

static PROGRAM_NAME: &str = "vskani";

fn main() {
    let app = build_cli();
    let matches = app.clone().get_matches();
    set_log_level(&matches, false, PROGRAM_NAME, crate_version!());

    let (subcommand, m) = match matches.subcommand() {
        Some(s) => s,
        None => panic!("Programming error"),
    };
    set_log_level(m, true, PROGRAM_NAME, crate_version!());

    let res = match subcommand {
        "skani" => run_skani_subcommand(m),
        "preprocess" => run_preprocess_subcommand(m),
        "mcl" => run_mcl_subcommand(m),
        "summarize" => run_summarize_subcommand(m),
        "all" => run_pipeline_subcommand(m),
        _ => panic!("Programming error"),
    };
    if let Err(e) = res {
        error!("{}", e);
        std::process::exit(1);
    }
    info!("Finished {}", subcommand);
}

fn build_cli() -> Command {
    let mut app = add_clap_verbosity_flags(Command::new(PROGRAM_NAME))
        .version(crate_version!())
        .about("Pairwise ANI of viral genomes and vMAGs with skani, clustered with MCL")
        .arg_required_else_help(true)
        .subcommand_required(true);

    app = add_skani_subcommand(app);
    app = add_preprocess_subcommand(app);
    app = add_mcl_subcommand(app);
    app = add_summarize_subcommand(app);
    add_pipeline_subcommand(app)
}
