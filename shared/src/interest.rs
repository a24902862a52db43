use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::member::Member;
use crate::plot::{PlotId, Priority};

/// One member's interest in a plot, as shown in the plot tooltip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotInterest {
    pub char: String,
    #[serde(rename = "prio")]
    pub priority: Priority,
}

pub type InterestIndex = BTreeMap<PlotId, Vec<PlotInterest>>;

/// Reverse index plot -> interested members. Entries keep roster order; there is no
/// secondary sort by priority.
pub fn build_interest_index(roster: &[Member]) -> InterestIndex {
    let mut index = InterestIndex::new();

    for member in roster {
        for (plot, priority) in member.plot_data.iter() {
            index.entry(plot).or_default().push(PlotInterest {
                char: member.display_name().to_string(),
                priority,
            });
        }
    }

    index
}

/// One-line tooltip text for a plot, e.g. `#4: Anna (1), Bert (3)`.
pub fn tooltip(index: &InterestIndex, plot: PlotId) -> String {
    match index.get(&plot) {
        Some(entries) if !entries.is_empty() => {
            let names: Vec<String> = entries
                .iter()
                .map(|entry| format!("{} ({})", entry.char, entry.priority))
                .collect();
            format!("{plot}: {}", names.join(", "))
        }
        _ => format!("{plot}: no interest"),
    }
}

#[cfg(test)]
mod tests {
    use super::{PlotInterest, build_interest_index, tooltip};
    use crate::member::{Member, PlotData};
    use crate::plot::{PlotId, Priority};

    fn plot(id: u32) -> PlotId {
        PlotId::new(id).expect("valid plot")
    }

    fn prio(value: u32) -> Priority {
        Priority::new(value).expect("valid priority")
    }

    fn member(battletag: &str, entries: &[(u32, u32)]) -> Member {
        Member {
            battletag: battletag.to_string(),
            char: String::new(),
            note: String::new(),
            plot_data: entries
                .iter()
                .map(|(p, v)| (plot(*p), prio(*v)))
                .collect::<PlotData>(),
        }
    }

    #[test]
    fn index_keeps_roster_order() {
        let roster = vec![member("a", &[(1, 1)]), member("b", &[(1, 1), (2, 2)])];

        let index = build_interest_index(&roster);

        assert_eq!(
            index.get(&plot(1)),
            Some(&vec![
                PlotInterest {
                    char: "a".to_string(),
                    priority: prio(1)
                },
                PlotInterest {
                    char: "b".to_string(),
                    priority: prio(1)
                },
            ])
        );
        assert_eq!(index.get(&plot(2)).map(Vec::len), Some(1));
        assert!(index.get(&plot(3)).is_none());
    }

    #[test]
    fn index_does_not_sort_by_priority() {
        let roster = vec![member("late", &[(7, 9)]), member("early", &[(7, 1)])];
        let index = build_interest_index(&roster);
        let order: Vec<&str> = index[&plot(7)].iter().map(|e| e.char.as_str()).collect();
        assert_eq!(order, vec!["late", "early"]);
    }

    #[test]
    fn every_ranked_pair_appears_exactly_once() {
        let roster = vec![
            member("a", &[(1, 1), (5, 2), (9, 3)]),
            member("b", &[]),
            member("c", &[(5, 1), (53, 2)]),
            member("d", &[(9, 1)]),
        ];

        let index = build_interest_index(&roster);

        let indexed: usize = index.values().map(Vec::len).sum();
        let ranked: usize = roster.iter().map(|m| m.plot_data.len()).sum();
        assert_eq!(indexed, ranked);
    }

    #[test]
    fn tooltip_lists_characters_with_priorities() {
        let mut roster = vec![member("a#1", &[(4, 1)]), member("b#2", &[(4, 3)])];
        roster[0].char = "Anna".to_string();
        roster[1].char = "Bert".to_string();
        let index = build_interest_index(&roster);

        assert_eq!(tooltip(&index, plot(4)), "#4: Anna (1), Bert (3)");
        assert_eq!(tooltip(&index, plot(5)), "#5: no interest");
    }
}
