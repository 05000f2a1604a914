use std::cmp::Ordering;
use std::fmt;

use regex::Regex;
use serde::Deserialize;

use crate::error::ClusterError;

use super::node::Node;

/// Property of a node used for sorting
#[derive(Clone, Debug)]
enum SortField {
    Name,
    Ordinal,
    Cores,
    Busy,
    State,
    /// First capture group of a regular expression applied to the node name
    Pattern(Regex),
}

#[derive(Clone, Debug)]
struct SortKey {
    field: SortField,
    descending: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SortValue {
    Number(u64),
    Text(String),
}

impl SortKey {
    fn value(&self, node: &Node) -> Result<SortValue, String> {
        let value = match &self.field {
            SortField::Name => SortValue::Text(node.name.clone()),
            SortField::Ordinal => SortValue::Number(node.numbering.ordinal.unwrap_or(u64::MAX)),
            SortField::Cores => SortValue::Number(node.cores.len() as u64),
            SortField::Busy => SortValue::Number(node.busy() as u64),
            SortField::State => SortValue::Text(node.state.to_string()),
            SortField::Pattern(regex) => {
                let captures = regex
                    .captures(&node.name)
                    .ok_or_else(|| format!("/{}/ does not match the node name", regex))?;
                let group = captures
                    .get(1)
                    .ok_or_else(|| format!("/{}/ captured nothing", regex))?
                    .as_str();

                match group.parse::<u64>() {
                    Ok(number) => SortValue::Number(number),
                    Err(_) => SortValue::Text(group.to_string()),
                }
            }
        };

        Ok(value)
    }
}

/// Comma separated list of sort keys, e.g. `-busy,/wn-(\d+)/,name`.
///
/// Keys are `name`, `ordinal`, `cores`, `busy`, `state`, or a regular expression
/// between slashes whose first capture group is compared, numerically if possible.
/// A leading `-` reverses the order of a key.
#[derive(Clone, Debug, Deserialize)]
#[serde(try_from = "String")]
pub struct SortExpression {
    source: String,
    keys: Vec<SortKey>,
}

impl SortExpression {
    pub fn parse(expression: &str) -> Result<Self, String> {
        let mut keys = Vec::new();
        let mut rest = expression.trim();

        while !rest.is_empty() {
            let (descending, body) = match rest.strip_prefix('-') {
                Some(body) => (true, body.trim_start()),
                None => (false, rest),
            };

            let (field, remainder) = if let Some(pattern) = body.strip_prefix('/') {
                let end = pattern
                    .find('/')
                    .ok_or_else(|| format!("unterminated pattern in {:?}", expression))?;
                let regex = Regex::new(&pattern[..end]).map_err(|err| err.to_string())?;
                if regex.captures_len() < 2 {
                    return Err(format!("/{}/ has no capture group", regex));
                }

                (SortField::Pattern(regex), &pattern[end + 1..])
            } else {
                let end = body.find(',').unwrap_or(body.len());
                let field = match body[..end].trim() {
                    "name" => SortField::Name,
                    "ordinal" => SortField::Ordinal,
                    "cores" => SortField::Cores,
                    "busy" => SortField::Busy,
                    "state" => SortField::State,
                    name => return Err(format!("unknown sort key {:?}", name)),
                };

                (field, &body[end..])
            };

            let remainder = remainder.trim_start();
            rest = match remainder.strip_prefix(',') {
                Some(rest) => rest.trim_start(),
                None if remainder.is_empty() => remainder,
                None => return Err(format!("expected ',' before {:?}", remainder)),
            };

            keys.push(SortKey { field, descending });
        }

        Ok(Self {
            source: expression.to_string(),
            keys,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Sorts nodes in place; nodes are left untouched if any key cannot be evaluated
    pub fn sort(&self, nodes: &mut Vec<Node>) -> Result<(), ClusterError> {
        let mut keyed = Vec::with_capacity(nodes.len());
        for (idx, node) in nodes.iter().enumerate() {
            let values = self
                .keys
                .iter()
                .map(|key| key.value(node))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|reason| ClusterError::SortExpression {
                    expression: self.source.clone(),
                    node: node.name.clone(),
                    reason,
                })?;

            keyed.push((values, idx));
        }

        // Stable, so that nodes with equal keys keep the order reported by the scheduler
        keyed.sort_by(|(a, _), (b, _)| self.compare(a, b));

        let mut slots: Vec<Option<Node>> = nodes.drain(..).map(Some).collect();
        nodes.extend(keyed.into_iter().filter_map(|(_, idx)| slots[idx].take()));

        Ok(())
    }

    fn compare(&self, a: &[SortValue], b: &[SortValue]) -> Ordering {
        for ((key, a), b) in self.keys.iter().zip(a).zip(b) {
            let ordering = if key.descending { b.cmp(a) } else { a.cmp(b) };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }

        Ordering::Equal
    }
}

impl TryFrom<String> for SortExpression {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl fmt::Display for SortExpression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::JobTable;
    use crate::scheduler::RawNode;

    fn nodes(specs: &[(&str, usize)]) -> Vec<Node> {
        specs
            .iter()
            .map(|(name, cores)| {
                let raw = RawNode {
                    name: name.to_string(),
                    state: '-',
                    cores: *cores,
                    ..Default::default()
                };

                Node::from_raw(raw, &JobTable::default()).unwrap()
            })
            .collect()
    }

    fn names(nodes: &[Node]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn test_parse() {
        assert_eq!(SortExpression::parse("name").unwrap().keys.len(), 1);
        assert_eq!(SortExpression::parse("-cores, name").unwrap().keys.len(), 2);
        assert_eq!(
            SortExpression::parse(r"/wn-(\d{1,3})/,-busy").unwrap().keys.len(),
            2
        );
        assert!(SortExpression::parse("").unwrap().is_empty());

        assert!(SortExpression::parse("size").is_err());
        assert!(SortExpression::parse("/wn/").is_err());
        assert!(SortExpression::parse("/wn(").is_err());
        assert!(SortExpression::parse("/(wn)/ name").is_err());
    }

    #[test]
    fn test_sort() {
        let mut list = nodes(&[("wn03", 8), ("wn01", 4), ("ps02", 8), ("wn02", 4)]);

        SortExpression::parse("name").unwrap().sort(&mut list).unwrap();
        assert_eq!(names(&list), ["ps02", "wn01", "wn02", "wn03"]);

        SortExpression::parse("-cores,ordinal")
            .unwrap()
            .sort(&mut list)
            .unwrap();
        assert_eq!(names(&list), ["ps02", "wn03", "wn01", "wn02"]);

        SortExpression::parse(r"/^[a-z]+(\d+)/")
            .unwrap()
            .sort(&mut list)
            .unwrap();
        assert_eq!(names(&list), ["wn01", "ps02", "wn02", "wn03"]);
    }

    #[test]
    fn test_sort_failure_keeps_nodes() {
        let mut list = nodes(&[("wn01", 4), ("gridmon", 4)]);
        let expression = SortExpression::parse(r"/wn(\d+)/").unwrap();

        let err = expression.sort(&mut list).unwrap_err();
        assert!(matches!(
            err,
            ClusterError::SortExpression { ref node, .. } if node == "gridmon"
        ));
        assert_eq!(names(&list), ["wn01", "gridmon"]);
    }
}
