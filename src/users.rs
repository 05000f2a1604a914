use std::collections::{BTreeMap, HashMap};

use ratatui::style::Color;

use crate::cluster::JobTable;
use crate::config::{Config, JobBucket, Symbols};
use crate::error::ClusterError;

/// Colors assigned to patterns missing from the configured palette
const ROTATION: [Color; 12] = [
    Color::Red,
    Color::Green,
    Color::Yellow,
    Color::Blue,
    Color::Magenta,
    Color::Cyan,
    Color::LightRed,
    Color::LightGreen,
    Color::LightYellow,
    Color::LightBlue,
    Color::LightMagenta,
    Color::LightCyan,
];

/// Display identity of an account with jobs in the cluster
#[derive(Clone, Debug, PartialEq)]
pub struct UserIdentity {
    pub account: String,
    /// Short token identifying the account
    pub token: String,
    /// Glyph shown in the core matrix; differs from the token once the pool is exhausted
    pub glyph: char,
    /// Key used to pick the color of the account
    pub pattern: String,
    pub color: Color,
    /// Jobs per state category
    pub counts: BTreeMap<JobBucket, usize>,
    pub total: usize,
}

impl UserIdentity {
    pub fn count(&self, bucket: JobBucket) -> usize {
        self.counts.get(&bucket).copied().unwrap_or_default()
    }

    pub fn running(&self) -> usize {
        self.count(JobBucket::Running)
    }

    pub fn queued(&self) -> usize {
        self.count(JobBucket::Queued)
    }

    /// Token as listed in the accounts table, e.g. `5` or `50=b`
    pub fn label(&self) -> String {
        if self.token.chars().eq([self.glyph]) {
            self.token.clone()
        } else {
            format!("{}={}", self.token, self.glyph)
        }
    }
}

/// Accounts of one refresh cycle, ordered by number of jobs
#[derive(Clone, Debug, Default)]
pub struct UserIdentities {
    users: Vec<UserIdentity>,
    /// Index into `users` by job key
    jobs: HashMap<String, usize>,
}

impl UserIdentities {
    /// Assigns tokens and colors to every account in `jobs`.
    ///
    /// Accounts are ordered by descending `(total jobs, account)` and tokens are handed
    /// out in that order, so the same job table always yields the same identities.
    pub fn assign(jobs: &JobTable, scheduler: &str, config: &Config) -> Result<Self, ClusterError> {
        let states = config.states(scheduler);
        let mut counts: HashMap<&str, BTreeMap<JobBucket, usize>> = HashMap::new();

        for job in jobs.iter() {
            let bucket = states
                .and_then(|states| states.get(&job.state))
                .ok_or_else(|| ClusterError::UnknownJobState {
                    state: job.state,
                    scheduler: scheduler.to_string(),
                })?;

            *counts
                .entry(job.user.as_str())
                .or_default()
                .entry(*bucket)
                .or_default() += 1;
        }

        let mut accounts: Vec<(usize, &str, BTreeMap<JobBucket, usize>)> = counts
            .into_iter()
            .map(|(account, counts)| (counts.values().sum(), account, counts))
            .collect();
        accounts.sort_unstable_by(|a, b| (b.0, b.1).cmp(&(a.0, a.1)));

        let pool = token_pool(&config.symbols);
        let overflow = overflow_glyphs(&config.symbols);
        let users: Vec<UserIdentity> = accounts
            .into_iter()
            .enumerate()
            .map(|(idx, (total, account, counts))| {
                let (token, glyph) = if config.letter_tokens {
                    let glyph = account.chars().next().unwrap_or('?');
                    (glyph.to_string(), glyph)
                } else {
                    match pool.get(idx) {
                        Some(&c) => (c.to_string(), c),
                        None => (
                            idx.to_string(),
                            overflow
                                .get(idx - pool.len())
                                .copied()
                                .unwrap_or(OVERFLOW_MARKER),
                        ),
                    }
                };

                let pattern = color_pattern(account, config);
                let color = config
                    .palette
                    .get(&pattern)
                    .copied()
                    .unwrap_or_else(|| fallback_color(&pattern));

                UserIdentity {
                    account: account.to_string(),
                    token,
                    glyph,
                    pattern,
                    color,
                    counts,
                    total,
                }
            })
            .collect();

        let by_account: HashMap<&str, usize> = users
            .iter()
            .enumerate()
            .map(|(idx, user)| (user.account.as_str(), idx))
            .collect();
        let jobs = jobs
            .iter()
            .filter_map(|job| Some((job.key().to_string(), *by_account.get(job.user.as_str())?)))
            .collect();

        Ok(Self { users, jobs })
    }

    pub fn get(&self, idx: usize) -> Option<&UserIdentity> {
        self.users.get(idx)
    }

    /// Index of the account owning the job with the given key
    pub fn owner(&self, key: &str) -> Option<usize> {
        self.jobs.get(key).copied()
    }

    pub fn position(&self, account: &str) -> Option<usize> {
        self.users.iter().position(|user| user.account == account)
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserIdentity> {
        self.users.iter()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// Tokens available for accounts: digits followed by ASCII punctuation, minus reserved glyphs
pub fn token_pool(symbols: &Symbols) -> Vec<char> {
    ('0'..='9')
        .chain('!'..='/')
        .chain(':'..='@')
        .chain('['..='`')
        .chain('{'..='~')
        .filter(|c| !symbols.contains(*c))
        .collect()
}

/// Shared glyph of accounts beyond the pool and the overflow letters
const OVERFLOW_MARKER: char = '…';

/// Matrix glyphs of accounts whose decimal token would not fit a single cell
fn overflow_glyphs(symbols: &Symbols) -> Vec<char> {
    ('a'..='z')
        .chain('A'..='Z')
        .filter(|c| !symbols.contains(*c))
        .collect()
}

/// Returns the color pattern of an account: the first matching rule, or the
/// leading alphabetic part of the account name
fn color_pattern(account: &str, config: &Config) -> String {
    if let Some(rule) = config
        .user_colors
        .iter()
        .find(|rule| rule.regex.is_match(account))
    {
        return rule.pattern.clone();
    }

    let end = account
        .find(|c: char| !c.is_alphabetic())
        .unwrap_or(account.len());

    match &account[..end] {
        "" => account.to_string(),
        prefix => prefix.to_string(),
    }
}

/// Color picked from a fixed rotation by a stable hash of the pattern
pub fn fallback_color(pattern: &str) -> Color {
    // FNV-1a; unlike `DefaultHasher` its output never changes between releases
    let hash = pattern.bytes().fold(0xcbf29ce484222325u64, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x100000001b3)
    });

    ROTATION[(hash % ROTATION.len() as u64) as usize]
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use regex::Regex;

    use super::*;
    use crate::cluster::Job;
    use crate::config::ColorRule;

    fn table(jobs: &[(&str, &str, char)]) -> JobTable {
        JobTable::new(
            jobs.iter()
                .map(|(id, user, state)| Job {
                    id: id.to_string(),
                    user: user.to_string(),
                    state: *state,
                    queue: "batch".into(),
                })
                .collect(),
        )
    }

    fn sample() -> Vec<(&'static str, &'static str, char)> {
        vec![
            ("1", "alice", 'R'),
            ("2", "alice", 'R'),
            ("3", "alice", 'Q'),
            ("4", "bob", 'R'),
            ("5", "carol", 'H'),
            ("6", "atlas001", 'Q'),
            ("7", "atlas002", 'R'),
        ]
    }

    #[test]
    fn test_token_pool() {
        let pool = token_pool(&Symbols::default());
        assert_eq!(&pool[..10], ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9']);
        assert_eq!(pool[10], '!');
        for c in ['#', '_', '|', ' '] {
            assert!(!pool.contains(&c));
        }
        // 10 digits, 32 punctuation characters, 3 reserved glyphs
        assert_eq!(pool.len(), 10 + 32 - 3);
    }

    #[test]
    fn test_assign() {
        let users = UserIdentities::assign(&table(&sample()), "pbs", &Config::default()).unwrap();
        let accounts: Vec<_> = users.iter().map(|u| (u.account.as_str(), u.token.as_str())).collect();

        assert_eq!(
            accounts,
            [
                ("alice", "0"),
                ("carol", "1"),
                ("bob", "2"),
                ("atlas002", "3"),
                ("atlas001", "4")
            ]
        );

        let alice = users.get(0).unwrap();
        assert_eq!((alice.running(), alice.queued(), alice.total), (2, 1, 3));
        assert_eq!(users.get(1).unwrap().count(JobBucket::Held), 1);
        assert_eq!(users.get(3).unwrap().pattern, "atlas");
        assert_eq!(users.owner("4"), Some(2));
        assert_eq!(users.position("carol"), Some(1));
    }

    #[test]
    fn test_tokens_are_deterministic() {
        let config = Config::default();
        let first = UserIdentities::assign(&table(&sample()), "pbs", &config).unwrap();

        let mut reversed = sample();
        reversed.reverse();
        let second = UserIdentities::assign(&table(&reversed), "pbs", &config).unwrap();

        assert_eq!(
            first.iter().collect::<Vec<_>>(),
            second.iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_tokens_beyond_pool() {
        let jobs: Vec<(String, String)> = (0..60)
            .map(|i| (i.to_string(), format!("user{:02}", i)))
            .collect();
        let jobs: Vec<_> = jobs
            .iter()
            .map(|(id, user)| (id.as_str(), user.as_str(), 'R'))
            .collect();

        let users = UserIdentities::assign(&table(&jobs), "pbs", &Config::default()).unwrap();
        let pool = token_pool(&Symbols::default());
        let first = users.get(pool.len()).unwrap();
        assert_eq!(first.token, pool.len().to_string());
        assert_eq!(first.glyph, 'a');
        assert_eq!(first.label(), format!("{}=a", pool.len()));

        let last = users.get(59).unwrap();
        assert_eq!(last.token, "59");
        assert_eq!(last.glyph, (b'a' + (59 - pool.len()) as u8) as char);

        // Matrix glyphs stay unique past the pool
        let glyphs: HashSet<char> = users.iter().map(|user| user.glyph).collect();
        assert_eq!(glyphs.len(), 60);
        assert_eq!(users.get(5).unwrap().label(), "5");
    }

    #[test]
    fn test_letter_tokens() {
        let config = Config {
            letter_tokens: true,
            ..Config::default()
        };

        let users = UserIdentities::assign(&table(&sample()), "pbs", &config).unwrap();
        let tokens: Vec<_> = users.iter().map(|u| u.token.as_str()).collect();
        assert_eq!(tokens, ["a", "c", "b", "a", "a"]);
    }

    #[test]
    fn test_unknown_state() {
        let err = UserIdentities::assign(&table(&[("1", "alice", 'Z')]), "pbs", &Config::default())
            .unwrap_err();
        assert_eq!(
            err,
            ClusterError::UnknownJobState {
                state: 'Z',
                scheduler: "pbs".into()
            }
        );

        assert!(UserIdentities::assign(&table(&[("1", "alice", 'R')]), "lsf", &Config::default())
            .is_err());
    }

    #[test]
    fn test_color_rules() {
        let config = Config {
            user_colors: vec![
                ColorRule {
                    regex: Regex::new("^atlas00[12]").unwrap(),
                    pattern: "production".into(),
                },
                ColorRule {
                    regex: Regex::new("^atlas").unwrap(),
                    pattern: "atlas".into(),
                },
            ],
            palette: HashMap::from([("production".to_string(), Color::White)]),
            ..Config::default()
        };

        assert_eq!(color_pattern("atlas001", &config), "production");
        assert_eq!(color_pattern("atlas100", &config), "atlas");
        assert_eq!(color_pattern("cms", &config), "cms");
        assert_eq!(color_pattern("007", &config), "007");

        let users = UserIdentities::assign(&table(&sample()), "pbs", &config).unwrap();
        let atlas = users.get(users.position("atlas001").unwrap()).unwrap();
        assert_eq!(atlas.color, Color::White);
    }

    #[test]
    fn test_fallback_color_is_stable() {
        assert_eq!(fallback_color("alice"), fallback_color("alice"));
        assert!(ROTATION.contains(&fallback_color("")));
    }
}
