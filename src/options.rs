//! Launcher configuration.

use std::path::PathBuf;

const USAGE: &str = "usage: sagacious [-y|-i] [-d] [-s] [-t] [-p] [-w] <gamefile>
  -y  phrase messages as 'You are...'
  -i  phrase messages as 'I am...' (default)
  -d  debug tracing during load
  -s  authentic Scott Adams light messages
  -t  TRS80 layout (64 columns, divider rule, '. ' item separator)
  -p  prehistoric lamp: destroy the light source when it runs out
  -w  no split window";

#[derive(Debug, Clone, Default)]
pub struct Options {
    pub you_are: bool,
    pub debug: bool,
    pub scott_light: bool,
    pub trs80: bool,
    pub prehistoric_lamp: bool,
    pub split_screen: bool,
    pub game_file: PathBuf,
}

impl Options {
    pub fn parse(args: impl Iterator<Item = String>) -> Result<Options, String> {
        let mut options = Options {
            split_screen: true,
            ..Options::default()
        };
        let mut file = None;
        for arg in args {
            match arg.as_str() {
                "-y" => options.you_are = true,
                "-i" => options.you_are = false,
                "-d" => options.debug = true,
                "-s" => options.scott_light = true,
                "-t" => options.trs80 = true,
                "-p" => options.prehistoric_lamp = true,
                "-w" => options.split_screen = false,
                flag if flag.starts_with('-') => {
                    return Err(format!("unknown flag {flag}\n{USAGE}"));
                }
                path => {
                    if file.replace(PathBuf::from(path)).is_some() {
                        return Err(format!("more than one game file given\n{USAGE}"));
                    }
                }
            }
        }
        options.game_file = file.ok_or_else(|| format!("no game file given\n{USAGE}"))?;
        Ok(options)
    }

    /// Layout width in columns.
    pub fn width(&self) -> usize {
        if self.trs80 {
            64
        } else {
            80
        }
    }

    /// Rows in the status region.
    pub fn top_height(&self) -> u16 {
        if self.trs80 {
            11
        } else {
            10
        }
    }
}
