use std::ops::Range;

use ratatui::style::Color;
use tracing::warn;

use crate::cluster::{Cluster, CoreSlot, Node, NodeAttribute};
use crate::config::{Config, EmptyRows};
use crate::error::ClusterError;
use crate::users::UserIdentities;

use super::geometry::{columns, masking_start, paginate};

/// What a cell's color is derived from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorKey {
    /// Index of the account in [`UserIdentities`]
    User(usize),
    NonExistent,
    Free,
    Separator,
    Blank,
    /// Node state code
    State(char),
    Label,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub glyph: char,
    pub key: ColorKey,
}

impl Cell {
    pub fn new(glyph: char, key: ColorKey) -> Self {
        Self { glyph, key }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowKind {
    /// One digit of the node numbers
    Id,
    /// Occupation of a core of every node
    Core(usize),
    /// One character of a node attribute
    Attribute(NodeAttribute),
    /// All rows of a single node, when transposed
    Node(u64),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    pub kind: RowKind,
    pub label: String,
    pub cells: Vec<Cell>,
}

/// A single matrix covering a window of node columns
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    /// Column offsets; column `k` shows node `k + 1`
    pub window: Range<u64>,
    pub rows: Vec<Row>,
    /// True if no core row carries information at the configured elision level
    pub coreless: bool,
    pub transposed: bool,
}

impl Page {
    pub fn core_rows(&self) -> impl Iterator<Item = &Row> {
        self.rows
            .iter()
            .filter(|row| matches!(row.kind, RowKind::Core(_)))
    }
}

/// Core matrices of a cluster laid out for a given terminal width
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Occupancy {
    /// Hidden leading node columns
    pub start: u64,
    pub pages: Vec<Page>,
}

impl Occupancy {
    pub fn build(cluster: &Cluster, users: &UserIdentities, config: &Config, width: usize) -> Self {
        let start = masking_start(cluster, config);
        let builder = Builder {
            cluster,
            users,
            config,
            digits: cluster.highest_wn.max(1).to_string().len(),
            max_cores: cluster.max_cores(),
        };

        let pages = if config.transpose {
            let window = start..cluster.highest_wn;
            if window.is_empty() {
                Vec::new()
            } else {
                vec![builder.transpose(builder.page(window))]
            }
        } else {
            paginate(
                start,
                cluster.highest_wn,
                columns(width, config),
                config.cut_width.is_some(),
            )
            .into_iter()
            .map(|window| builder.page(window))
            .collect()
        };

        for line in &config.attributes {
            let cropped = cluster
                .nodes
                .values()
                .filter_map(|node| node.attribute(line.attribute))
                .filter(|value| value.chars().count() > line.max_len)
                .count();

            if cropped > 0 {
                warn!(
                    "{} values of attribute {} cropped to {} characters",
                    cropped, line.attribute, line.max_len
                );
            }
        }

        Self { start, pages }
    }

    /// Pages with at least one meaningful core row
    pub fn visible_pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.iter().filter(|page| !page.coreless)
    }
}

struct Builder<'a> {
    cluster: &'a Cluster,
    users: &'a UserIdentities,
    config: &'a Config,
    /// Rows needed for the highest node number
    digits: usize,
    max_cores: usize,
}

impl Builder<'_> {
    fn page(&self, window: Range<u64>) -> Page {
        let nodes: Vec<Option<&Node>> = window
            .clone()
            .map(|column| self.cluster.nodes.get(&(column + 1)))
            .collect();

        let mut rows = self.id_rows(&window);

        let level = self.config.empty_rows;
        let core_rows: Vec<Row> = (0..self.max_cores)
            .map(|core| Row {
                kind: RowKind::Core(core),
                label: core.to_string(),
                cells: nodes.iter().map(|node| self.core_cell(*node, core)).collect(),
            })
            .filter(|row| !is_elidable(&row.cells, level))
            .collect();

        let coreless = level != EmptyRows::Keep && core_rows.is_empty();
        rows.extend(core_rows);
        rows.extend(self.attribute_rows(&nodes));

        Page {
            window,
            rows,
            coreless,
            transposed: false,
        }
    }

    fn id_rows(&self, window: &Range<u64>) -> Vec<Row> {
        let numbers: Vec<Vec<char>> = window
            .clone()
            .map(|column| format!("{:0width$}", column + 1, width = self.digits).chars().collect())
            .collect();

        (0..self.digits)
            .map(|digit| Row {
                kind: RowKind::Id,
                label: String::new(),
                cells: numbers
                    .iter()
                    .map(|number| Cell::new(number[digit], ColorKey::Label))
                    .collect(),
            })
            .collect()
    }

    fn core_cell(&self, node: Option<&Node>, core: usize) -> Cell {
        let symbols = &self.config.symbols;
        let non_existent = Cell::new(symbols.non_existent, ColorKey::NonExistent);

        match node.and_then(|node| node.cores.get(core)) {
            Some(CoreSlot::Free) => Cell::new(symbols.free, ColorKey::Free),
            Some(CoreSlot::Busy(key)) => match self.users.owner(key) {
                Some(idx) => {
                    let glyph = self.users.get(idx).map(|u| u.glyph).unwrap_or('?');
                    Cell::new(glyph, ColorKey::User(idx))
                }
                None => non_existent,
            },
            // Placeholders and cores beyond the core count of a node
            None => non_existent,
        }
    }

    fn attribute_rows(&self, nodes: &[Option<&Node>]) -> Vec<Row> {
        let blank = Cell::new(self.config.symbols.blank, ColorKey::Blank);
        let mut rows = Vec::new();

        for line in &self.config.attributes {
            let values: Vec<Vec<char>> = nodes
                .iter()
                .map(|node| {
                    node.and_then(|node| node.attribute(line.attribute))
                        .unwrap_or_default()
                        .chars()
                        .collect()
                })
                .collect();

            for idx in 0..line.max_len {
                let cells = values
                    .iter()
                    .map(|value| match value.get(idx) {
                        Some(&c) if line.attribute == NodeAttribute::State => {
                            Cell::new(c, ColorKey::State(c))
                        }
                        Some(&c) => Cell::new(c, ColorKey::Label),
                        None => blank,
                    })
                    .collect();

                rows.push(Row {
                    kind: RowKind::Attribute(line.attribute),
                    label: if idx == 0 {
                        line.attribute.to_string()
                    } else {
                        String::new()
                    },
                    cells,
                });
            }
        }

        rows
    }

    /// Turns every node column into a row labelled with the node name, with separators
    /// between the id, core and attribute parts
    fn transpose(&self, page: Page) -> Page {
        let separator = Cell::new(self.config.symbols.separator, ColorKey::Separator);
        let groups: [Vec<&Row>; 3] = [
            page.rows.iter().filter(|row| row.kind == RowKind::Id).collect(),
            page.core_rows().collect(),
            page.rows
                .iter()
                .filter(|row| matches!(row.kind, RowKind::Attribute(_)))
                .collect(),
        ];

        let rows = page
            .window
            .clone()
            .enumerate()
            .map(|(idx, column)| {
                let mut cells = Vec::new();
                for (group, rows) in groups.iter().enumerate() {
                    if group > 0 && !rows.is_empty() {
                        cells.push(separator);
                    }

                    cells.extend(rows.iter().map(|row| row.cells[idx]));
                }

                let ordinal = column + 1;
                let label = match self.cluster.nodes.get(&ordinal) {
                    Some(node) if !node.label.is_empty() => node.label.clone(),
                    _ => ordinal.to_string(),
                };

                Row {
                    kind: RowKind::Node(ordinal),
                    label,
                    cells,
                }
            })
            .collect();

        Page {
            window: page.window.clone(),
            rows,
            coreless: page.coreless,
            transposed: true,
        }
    }
}

/// Returns true if a core row carries no information at the given level
fn is_elidable(cells: &[Cell], level: EmptyRows) -> bool {
    let all = |f: fn(ColorKey) -> bool| cells.iter().all(|cell| f(cell.key));

    match level {
        EmptyRows::Keep => false,
        EmptyRows::NonExistent => all(|key| key == ColorKey::NonExistent),
        EmptyRows::Free => all(|key| key == ColorKey::Free),
        EmptyRows::Either => all(|key| matches!(key, ColorKey::Free | ColorKey::NonExistent)),
    }
}

/// Fails if an attribute line is configured that `scheduler` does not report
pub fn check_attributes(
    config: &Config,
    supported: &[NodeAttribute],
    scheduler: &str,
) -> Result<(), ClusterError> {
    match config
        .attributes
        .iter()
        .find(|line| !supported.contains(&line.attribute))
    {
        Some(line) => Err(ClusterError::UnsupportedAttribute {
            attribute: line.attribute.to_string(),
            scheduler: scheduler.to_string(),
        }),
        None => Ok(()),
    }
}

/// Foreground color of a cell
pub fn color(key: ColorKey, users: &UserIdentities, config: &Config) -> Color {
    match key {
        ColorKey::User(idx) => users.get(idx).map(|u| u.color).unwrap_or(Color::Reset),
        ColorKey::NonExistent => Color::DarkGray,
        ColorKey::Free => Color::Gray,
        ColorKey::Separator => Color::DarkGray,
        ColorKey::Blank | ColorKey::Label => Color::Reset,
        ColorKey::State(state) => config
            .state_colors
            .get(&state)
            .copied()
            .unwrap_or(Color::Reset),
    }
}
