use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{bail, eyre, Context};
use color_eyre::Result;
use ratatui::style::Color;
use regex::Regex;
use serde::Deserialize;

use crate::args::Args;
use crate::cluster::{regex_from_str, NameRule, NodeAttribute, NodeFilter, SortExpression};

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "QTOP_CONFIG";

/// Category a scheduler specific job state is counted under
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum JobBucket {
    Running,
    Queued,
    Held,
    Waiting,
    Exiting,
    Suspended,
    Completed,
    Cancelled,
}

/// Node attribute shown vertically below the core matrix
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AttributeLine {
    pub attribute: NodeAttribute,
    /// Number of rows; longer values are cropped
    pub max_len: usize,
}

/// Assigns a color pattern to accounts matching a regular expression
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColorRule {
    #[serde(deserialize_with = "regex_from_str")]
    pub regex: Regex,
    pub pattern: String,
}

/// Glyphs reserved for cells that do not belong to a user
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Symbols {
    pub non_existent: char,
    pub free: char,
    pub separator: char,
    pub blank: char,
}

impl Default for Symbols {
    fn default() -> Self {
        Self {
            non_existent: '#',
            free: '_',
            separator: '|',
            blank: ' ',
        }
    }
}

impl Symbols {
    /// Returns true if `c` is one of the reserved glyphs
    pub fn contains(&self, c: char) -> bool {
        [self.non_existent, self.free, self.separator, self.blank].contains(&c)
    }
}

/// Which core rows are hidden from the matrix
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(try_from = "u8")]
pub enum EmptyRows {
    /// Show every row
    Keep,
    /// Hide rows where no node has the core
    #[default]
    NonExistent,
    /// Hide rows where every core is free
    Free,
    /// Hide rows without any job
    Either,
}

impl TryFrom<u8> for EmptyRows {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EmptyRows::Keep),
            1 => Ok(EmptyRows::NonExistent),
            2 => Ok(EmptyRows::Free),
            3 => Ok(EmptyRows::Either),
            _ => Err(format!("empty_rows must be between 0 and 3, not {}", value)),
        }
    }
}

/// Settings of a single refresh cycle
#[derive(Clone, Debug)]
pub struct Config {
    /// Nodes are renumbered if the lowest node number exceeds this value
    pub exotic_starting_wn: u64,
    /// Nodes are renumbered if a larger fraction of nodes is down or offline
    pub offline_down_fraction: f64,
    pub blind_remap: bool,
    pub no_masking: bool,
    /// Leading node columns are hidden if the lowest node number exceeds this value
    pub min_masking_threshold: u64,
    /// Fixed number of node columns per matrix
    pub cut_width: Option<usize>,
    /// Columns taken up by row labels
    pub label_overhead: usize,
    pub max_label_len: usize,
    pub attributes: Vec<AttributeLine>,
    /// Job state codes by scheduler name
    pub state_abbreviations: HashMap<String, BTreeMap<char, JobBucket>>,
    pub user_colors: Vec<ColorRule>,
    /// Colors by pattern key
    pub palette: HashMap<String, Color>,
    /// Colors of node state codes
    pub state_colors: HashMap<char, Color>,
    pub symbols: Symbols,
    pub transpose: bool,
    pub empty_rows: EmptyRows,
    pub letter_tokens: bool,
    pub sort: Option<SortExpression>,
    pub filter: NodeFilter,
    pub name_rules: Vec<NameRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exotic_starting_wn: 10,
            offline_down_fraction: 0.5,
            blind_remap: false,
            no_masking: false,
            min_masking_threshold: 5,
            cut_width: None,
            label_overhead: 11,
            max_label_len: 10,
            attributes: vec![
                AttributeLine {
                    attribute: NodeAttribute::State,
                    max_len: 1,
                },
                AttributeLine {
                    attribute: NodeAttribute::Queues,
                    max_len: 3,
                },
            ],
            state_abbreviations: default_state_abbreviations(),
            user_colors: Vec::new(),
            palette: HashMap::new(),
            state_colors: HashMap::from([
                ('d', Color::Red),
                ('o', Color::LightRed),
                ('s', Color::Yellow),
                ('%', Color::Cyan),
                ('?', Color::DarkGray),
            ]),
            symbols: Symbols::default(),
            transpose: false,
            empty_rows: EmptyRows::default(),
            letter_tokens: false,
            sort: None,
            filter: NodeFilter::default(),
            name_rules: Vec::new(),
        }
    }
}

fn default_state_abbreviations() -> HashMap<String, BTreeMap<char, JobBucket>> {
    use JobBucket::*;

    let pbs = [
        ('Q', Queued),
        ('R', Running),
        ('C', Completed),
        ('E', Exiting),
        ('H', Held),
        ('W', Waiting),
        ('T', Waiting),
        ('S', Suspended),
        ('B', Running),
    ];
    let oar = [
        ('R', Running),
        ('W', Queued),
        ('L', Running),
        ('F', Exiting),
        ('H', Held),
        ('S', Suspended),
        ('T', Waiting),
        ('E', Cancelled),
        ('t', Waiting),
    ];
    let sge = [
        ('r', Running),
        ('t', Running),
        ('R', Running),
        ('w', Queued),
        ('h', Held),
        ('s', Suspended),
        ('S', Suspended),
        ('T', Suspended),
        ('d', Cancelled),
        ('E', Cancelled),
    ];
    let demo = [('R', Running), ('Q', Queued), ('H', Held)];

    HashMap::from([
        ("pbs".to_string(), BTreeMap::from(pbs)),
        ("snapshot".to_string(), BTreeMap::from(pbs)),
        ("oar".to_string(), BTreeMap::from(oar)),
        ("sge".to_string(), BTreeMap::from(sge)),
        ("demo".to_string(), BTreeMap::from(demo)),
    ])
}

/// Contents of a configuration file; every setting is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    exotic_starting_wn: Option<u64>,
    offline_down_fraction: Option<f64>,
    blind_remap: Option<bool>,
    no_masking: Option<bool>,
    min_masking_threshold: Option<u64>,
    cut_width: Option<usize>,
    label_overhead: Option<usize>,
    max_label_len: Option<usize>,
    attributes: Option<Vec<AttributeLine>>,
    #[serde(default)]
    state_abbreviations: HashMap<String, BTreeMap<char, JobBucket>>,
    user_colors: Option<Vec<ColorRule>>,
    #[serde(default)]
    palette: HashMap<String, Color>,
    #[serde(default)]
    state_colors: HashMap<char, Color>,
    symbols: Option<Symbols>,
    transpose: Option<bool>,
    empty_rows: Option<EmptyRows>,
    letter_tokens: Option<bool>,
    sort: Option<SortExpression>,
    filter: Option<NodeFilter>,
    name_rules: Option<Vec<NameRule>>,
}

impl Config {
    /// Loads the configuration file named on the command line or by `$QTOP_CONFIG`,
    /// and applies command-line overrides
    pub fn load(args: &Args) -> Result<Self> {
        let path = args
            .config
            .clone()
            .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.apply_args(args)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read config file {}", path.display()))?;

        Self::from_toml(&contents)
            .wrap_err_with(|| format!("failed to parse config file {}", path.display()))
    }

    /// Parses configuration file contents, filling in defaults for missing settings
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: FileConfig = toml::from_str(contents)?;
        let mut config = Self::default();

        if let Some(fraction) = file.offline_down_fraction {
            if !(0.0..=1.0).contains(&fraction) {
                bail!("offline_down_fraction must be between 0 and 1, not {}", fraction);
            }

            config.offline_down_fraction = fraction;
        }

        if let Some(symbols) = file.symbols {
            let mut glyphs = vec![symbols.non_existent, symbols.free, symbols.separator];
            glyphs.sort_unstable();
            glyphs.dedup();
            if glyphs.len() < 3 {
                bail!("symbols for non-existent cores, free cores and separators must differ");
            }

            config.symbols = symbols;
        }

        for (scheduler, states) in file.state_abbreviations {
            config
                .state_abbreviations
                .entry(scheduler)
                .or_default()
                .extend(states);
        }

        config.palette.extend(file.palette);
        config.state_colors.extend(file.state_colors);

        merge(&mut config.exotic_starting_wn, file.exotic_starting_wn);
        merge(&mut config.blind_remap, file.blind_remap);
        merge(&mut config.no_masking, file.no_masking);
        merge(&mut config.min_masking_threshold, file.min_masking_threshold);
        merge(&mut config.label_overhead, file.label_overhead);
        merge(&mut config.max_label_len, file.max_label_len);
        merge(&mut config.attributes, file.attributes);
        merge(&mut config.user_colors, file.user_colors);
        merge(&mut config.transpose, file.transpose);
        merge(&mut config.empty_rows, file.empty_rows);
        merge(&mut config.letter_tokens, file.letter_tokens);
        merge(&mut config.filter, file.filter);
        merge(&mut config.name_rules, file.name_rules);
        config.cut_width = file.cut_width.or(config.cut_width);
        config.sort = file.sort.filter(|sort| !sort.is_empty());

        Ok(config)
    }

    fn apply_args(&mut self, args: &Args) -> Result<()> {
        self.blind_remap |= args.remap;
        self.no_masking |= args.no_masking;
        self.transpose |= args.transpose;
        self.letter_tokens |= args.letters;

        if let Some(cut) = args.cut {
            self.cut_width = Some(cut);
        }

        if let Some(level) = args.empty_rows {
            self.empty_rows = EmptyRows::try_from(level).map_err(|err| eyre!(err))?;
        }

        if let Some(sort) = &args.sort {
            let sort = SortExpression::parse(sort)
                .map_err(|err| eyre!(err))
                .wrap_err("invalid --sort expression")?;
            self.sort = Some(sort).filter(|sort| !sort.is_empty());
        }

        Ok(())
    }

    /// Job state table of the named scheduler
    pub fn states(&self, scheduler: &str) -> Option<&BTreeMap<char, JobBucket>> {
        self.state_abbreviations.get(scheduler)
    }
}

fn merge<T>(value: &mut T, update: Option<T>) {
    if let Some(update) = update {
        *value = update;
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use argh::FromArgs;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.exotic_starting_wn, 10);
        assert_eq!(config.offline_down_fraction, 0.5);
        assert_eq!(config.min_masking_threshold, 5);
        assert_eq!(config.label_overhead, 11);
        assert_eq!(config.empty_rows, EmptyRows::NonExistent);
        assert_eq!(config.symbols, Symbols::default());
        assert_eq!(config.attributes.len(), 2);
        assert_eq!(config.states("pbs").unwrap()[&'R'], JobBucket::Running);
        assert_eq!(config.states("sge").unwrap()[&'w'], JobBucket::Queued);
        assert!(config.sort.is_none());
    }

    #[test]
    fn test_from_toml() {
        let config = Config::from_toml(
            r#"
            exotic_starting_wn = 100
            blind_remap = true
            cut_width = 20
            empty_rows = 3
            sort = "-busy, name"
            attributes = [{ attribute = "name", max_len = 6 }]
            user_colors = [{ regex = "^atlas", pattern = "atlas" }]

            [palette]
            atlas = "lightblue"

            [state_colors]
            d = "magenta"

            [state_abbreviations.pbs]
            X = "cancelled"

            [symbols]
            free = "."

            [filter]
            out_by_state = ["o"]
            in_by_pattern = ["^wn"]

            [[name_rules]]
            pattern = "^(wn\\d+)\\..*$"
            replacement = "$1"
            "#,
        )
        .unwrap();

        assert_eq!(config.exotic_starting_wn, 100);
        assert!(config.blind_remap);
        assert_eq!(config.cut_width, Some(20));
        assert_eq!(config.empty_rows, EmptyRows::Either);
        assert_eq!(config.sort.as_ref().unwrap().to_string(), "-busy, name");
        assert_eq!(
            config.attributes,
            [AttributeLine {
                attribute: NodeAttribute::Name,
                max_len: 6
            }]
        );
        assert_eq!(config.user_colors[0].pattern, "atlas");
        assert_eq!(config.palette["atlas"], Color::LightBlue);
        assert_eq!(config.state_colors[&'d'], Color::Magenta);
        assert_eq!(config.state_colors[&'o'], Color::LightRed);
        // Abbreviations extend the defaults
        let pbs = config.states("pbs").unwrap();
        assert_eq!(pbs[&'X'], JobBucket::Cancelled);
        assert_eq!(pbs[&'Q'], JobBucket::Queued);
        assert_eq!(config.symbols.free, '.');
        assert_eq!(config.symbols.non_existent, '#');
        assert_eq!(config.filter.out_by_state, ['o']);
        assert_eq!(config.name_rules.len(), 1);
    }

    #[test]
    fn test_invalid_files() {
        assert!(Config::from_toml("unknown_setting = 1").is_err());
        assert!(Config::from_toml("empty_rows = 4").is_err());
        assert!(Config::from_toml("sort = \"size\"").is_err());
        assert!(Config::from_toml("offline_down_fraction = 1.5").is_err());
        assert!(Config::from_toml("[filter]\nout_by_pattern = [\"(\"]").is_err());
        assert!(Config::from_toml("[symbols]\nfree = \"#\"").is_err());
        assert!(Config::from_toml("[state_abbreviations.pbs]\nR = \"gone\"").is_err());
    }

    #[test]
    fn test_load_with_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cut_width = 20\nempty_rows = 0").unwrap();

        let path = file.path().to_string_lossy().to_string();
        let args = Args::from_args(
            &["qtop"],
            &["--config", &path, "--cut", "30", "--remap", "--sort", "name"],
        )
        .unwrap();

        let config = Config::load(&args).unwrap();
        assert_eq!(config.cut_width, Some(30));
        assert_eq!(config.empty_rows, EmptyRows::Keep);
        assert!(config.blind_remap);
        assert!(config.sort.is_some());

        let args = Args::from_args(&["qtop"], &["--config", "/nonexistent/qtop.toml"]).unwrap();
        assert!(Config::load(&args).is_err());

        let args = Args::from_args(&["qtop"], &["--empty-rows", "7"]).unwrap();
        assert!(Config::load(&args).is_err());
    }
}
