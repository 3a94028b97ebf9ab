use log::debug;
use sagacious::chance::Chance;
use sagacious::display_manager::{create_display, DisplayMode};
use sagacious::interpreter::Interpreter;
use sagacious::loader::{self, LoadError};
use sagacious::options::Options;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = match Options::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(problem) => {
            eprintln!("{problem}");
            std::process::exit(2);
        }
    };

    let default_level = if options.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let file_name = options.game_file.display().to_string();
    debug!("loading {file_name}");
    let image = std::fs::read(&options.game_file)
        .map_err(|e| LoadError::new(format!("{file_name}: {e}")))?;
    let game = loader::load_database(&image, &file_name)?;
    debug!("{game}");

    let display = create_display(&options, DisplayMode::Auto)?;
    let mut interpreter = Interpreter::new(game, options, display, Chance::new_uniform());
    interpreter.print_banner()?;
    interpreter.run()?;
    Ok(())
}
