/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Child ordering for a resolved view.
//!
//! `Manual` orders by stored `order` ascending and ignores direction. Every
//! other option is a comparator over one field; ties compare equal so the
//! stable sort keeps input order. Optional fields sort missing values last in
//! both directions.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::hierarchy::Hierarchy;
use crate::model::ContentNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOption {
    #[default]
    Manual,
    Name,
    #[serde(rename = "type")]
    Kind,
    CreatedAt,
    UpdatedAt,
    Rating,
    ItemCount,
    ViewCount,
    LikeCount,
    SourceCreatedAt,
}

impl SortOption {
    pub fn parse(value: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::String(value.trim().to_string())).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Sort key and direction for one view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortSpec {
    pub option: SortOption,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(option: SortOption, direction: SortDirection) -> Self {
        Self { option, direction }
    }

    /// The sort a container has chosen for itself.
    pub fn for_container(node: &ContentNode) -> Self {
        Self {
            option: node.sort_option.unwrap_or_default(),
            direction: node.sort_direction.unwrap_or_default(),
        }
    }
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

/// Compare optional values; `None` always sorts after `Some`.
fn compare_optional<T, F>(a: Option<T>, b: Option<T>, direction: SortDirection, cmp: F) -> Ordering
where
    F: Fn(&T, &T) -> Ordering,
{
    match (a, b) {
        (Some(a), Some(b)) => directed(cmp(&a, &b), direction),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare(a: &ContentNode, b: &ContentNode, spec: SortSpec, hierarchy: &Hierarchy) -> Ordering {
    let direction = spec.direction;
    match spec.option {
        SortOption::Manual => a.order.total_cmp(&b.order),
        SortOption::Name => directed(
            a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            direction,
        ),
        SortOption::Kind => directed(a.kind.as_str().cmp(b.kind.as_str()), direction),
        SortOption::CreatedAt => directed(a.created_at.cmp(&b.created_at), direction),
        SortOption::UpdatedAt => directed(a.updated_at.cmp(&b.updated_at), direction),
        SortOption::Rating => compare_optional(
            a.rating.filter(|r| r.is_finite()),
            b.rating.filter(|r| r.is_finite()),
            direction,
            |x, y| x.total_cmp(y),
        ),
        SortOption::ItemCount => directed(
            hierarchy.item_count(&a.id).cmp(&hierarchy.item_count(&b.id)),
            direction,
        ),
        SortOption::ViewCount => compare_optional(a.view_count, b.view_count, direction, Ord::cmp),
        SortOption::LikeCount => compare_optional(a.like_count, b.like_count, direction, Ord::cmp),
        SortOption::SourceCreatedAt => compare_optional(
            a.source_created_at,
            b.source_created_at,
            direction,
            Ord::cmp,
        ),
    }
}

/// Stable in-place sort of sibling references.
pub fn sort_nodes(nodes: &mut [&ContentNode], spec: SortSpec, hierarchy: &Hierarchy) {
    nodes.sort_by(|a, b| compare(a, b, spec, hierarchy));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::build_hierarchy;
    use crate::model::NodeKind;
    use proptest::prelude::*;

    fn item(id: &str, order: f64) -> ContentNode {
        let mut node = ContentNode::with_id(id, NodeKind::Note, id);
        node.order = order;
        node
    }

    fn ids(nodes: &[&ContentNode]) -> Vec<String> {
        nodes.iter().map(|node| node.id.clone()).collect()
    }

    #[test]
    fn test_manual_ignores_direction() {
        let a = item("a", 2.0);
        let b = item("b", 1.0);
        let hierarchy = Hierarchy::default();
        let mut nodes = vec![&a, &b];
        sort_nodes(
            &mut nodes,
            SortSpec::new(SortOption::Manual, SortDirection::Desc),
            &hierarchy,
        );
        assert_eq!(ids(&nodes), ["b", "a"]);
    }

    #[test]
    fn test_name_is_case_insensitive_and_directed() {
        let mut a = item("1", 0.0);
        a.title = "beta".to_string();
        let mut b = item("2", 0.0);
        b.title = "Alpha".to_string();
        let hierarchy = Hierarchy::default();
        let mut nodes = vec![&a, &b];
        sort_nodes(&mut nodes, SortSpec::new(SortOption::Name, SortDirection::Asc), &hierarchy);
        assert_eq!(ids(&nodes), ["2", "1"]);
        sort_nodes(&mut nodes, SortSpec::new(SortOption::Name, SortDirection::Desc), &hierarchy);
        assert_eq!(ids(&nodes), ["1", "2"]);
    }

    #[test]
    fn test_missing_publish_date_sorts_last_in_both_directions() {
        let mut old = item("old", 0.0);
        old.source_created_at = Some(10);
        let mut new = item("new", 0.0);
        new.source_created_at = Some(20);
        let undated = item("undated", 0.0);
        let hierarchy = Hierarchy::default();

        let mut nodes = vec![&undated, &old, &new];
        let asc = SortSpec::new(SortOption::SourceCreatedAt, SortDirection::Asc);
        sort_nodes(&mut nodes, asc, &hierarchy);
        assert_eq!(ids(&nodes), ["old", "new", "undated"]);

        let mut nodes = vec![&undated, &old, &new];
        let desc = SortSpec::new(SortOption::SourceCreatedAt, SortDirection::Desc);
        sort_nodes(&mut nodes, desc, &hierarchy);
        assert_eq!(ids(&nodes), ["new", "old", "undated"]);
    }

    #[test]
    fn test_item_count_reads_hierarchy() {
        let mut root = item("root", 0.0);
        root.kind = NodeKind::Folder;
        let mut big = item("big", 0.0);
        big.kind = NodeKind::Folder;
        big.parent_id = Some("root".to_string());
        let mut small = item("small", 1.0);
        small.kind = NodeKind::Folder;
        small.parent_id = Some("root".to_string());
        let mut inner = item("inner", 0.0);
        inner.parent_id = Some("big".to_string());
        let all = vec![root, big.clone(), small.clone(), inner];
        let hierarchy = build_hierarchy(&all);
        let mut nodes = vec![&big, &small];
        sort_nodes(
            &mut nodes,
            SortSpec::new(SortOption::ItemCount, SortDirection::Asc),
            &hierarchy,
        );
        assert_eq!(ids(&nodes), ["small", "big"]);
    }

    #[test]
    fn test_sort_option_wire_names() {
        assert_eq!(SortOption::parse("sourceCreatedAt"), Some(SortOption::SourceCreatedAt));
        assert_eq!(SortOption::parse("type"), Some(SortOption::Kind));
        assert_eq!(SortOption::parse("itemCount"), Some(SortOption::ItemCount));
        assert_eq!(SortOption::parse("bogus"), None);
    }

    proptest! {
        #[test]
        fn prop_manual_sort_with_equal_orders_keeps_input_order(count in 0usize..40, order in -5i32..5) {
            let nodes: Vec<ContentNode> = (0..count)
                .map(|i| item(&format!("n{i}"), f64::from(order)))
                .collect();
            let hierarchy = Hierarchy::default();
            let mut refs: Vec<&ContentNode> = nodes.iter().collect();
            sort_nodes(&mut refs, SortSpec::default(), &hierarchy);
            let expected: Vec<String> = nodes.iter().map(|node| node.id.clone()).collect();
            prop_assert_eq!(ids(&refs), expected);
        }
    }
}
