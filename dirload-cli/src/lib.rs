//! dirload command-line interface.
//!
//! - `dirload load <DIR>`: load a directory into one JSON or YAML document
//! - `dirload file <FILE>`: load a single file with the built-in parsers
//!
//! Settings come from built-in defaults, an optional `--config` file,
//! `DIRLOAD_*` environment variables and command-line flags, in that order.

pub mod cli;
pub mod commands;
pub mod settings;

pub use cli::{Cli, Commands, OutputArgs, OutputFormat};
pub use settings::{Overrides, Settings, SettingsProvider};

impl Commands {
    /// The settings this command's flags override.
    pub fn overrides(&self) -> Overrides {
        match self {
            Commands::Load {
                output,
                strict,
                array,
                deep_merge,
                concat_arrays,
                decode_names,
                include_symlinks,
                embed_dir_url,
                embed_file_url,
                ..
            } => Overrides {
                strict: settings::flag(*strict),
                array: settings::flag(*array),
                deep_merge: settings::flag(*deep_merge),
                concat_arrays: settings::flag(*concat_arrays),
                decode_names: settings::flag(*decode_names),
                include_symlinks: settings::flag(*include_symlinks),
                embed_directory_url_as: embed_dir_url.clone(),
                embed_file_url_as: embed_file_url.clone(),
                ..output.overrides()
            },
            Commands::File { output, .. } => output.overrides(),
        }
    }
}

impl OutputArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            format: self.format,
            compact: settings::flag(self.compact),
            ..Overrides::default()
        }
    }
}
