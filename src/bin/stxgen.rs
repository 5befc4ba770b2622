use std::fs;
use std::process::ExitCode;

use clap::Parser;

use sequence_transform_gen::cli::{Cli, FormatArg};
use sequence_transform_gen::compiler::{compile, CompilerContext};
use sequence_transform_gen::config::Config;
use sequence_transform_gen::error::CompileError;
use sequence_transform_gen::symbols::Format;

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level_filter())
        .parse_default_env()
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("stxgen: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), CompileError> {
    let mut config = Config::from_file(&cli.config)?;
    if let Some(format) = cli.format {
        config.override_format(match format {
            FormatArg::V3 => Format::V3,
            FormatArg::V3_2 => Format::V3_2,
        });
    }
    let rules_path = cli.out_dir.join(&config.rules_file_name);
    let rules_text = fs::read_to_string(&rules_path).map_err(|source| CompileError::RulesIo {
        path: rules_path.display().to_string(),
        source,
    })?;

    let context = CompilerContext::new(config)?;
    let output = compile(&context, &rules_text)?;

    let data_header_name = match context.symbols.format() {
        Format::V3 => "sequence_transform_data.h",
        Format::V3_2 => "sequence_transform_trie.h",
    };
    let data_path = cli.out_dir.join(data_header_name);
    fs::write(&data_path, &output.data_header).map_err(|source| CompileError::OutputIo {
        path: data_path.display().to_string(),
        source,
    })?;

    let test_path = cli.out_dir.join("sequence_transform_test.h");
    fs::write(&test_path, &output.test_header).map_err(|source| CompileError::OutputIo {
        path: test_path.display().to_string(),
        source,
    })?;

    log::info!("wrote {} and {}", data_path.display(), test_path.display());
    Ok(())
}
