// src/services/overlap.rs

use std::collections::HashSet;

use crate::models::{OverlapMap, Visit, VisitDraft, YearMonth};

/// Pares (mês, executivo) do lote que já têm visitas gravadas.
///
/// Cada par aparece uma única vez, não importa quantas linhas do lote o repitam.
/// Pares só de um dos lados não entram no resultado. O resultado não depende da
/// ordem das entradas.
pub fn find_overlaps(incoming: &[VisitDraft], existing: &[Visit]) -> OverlapMap {
    let existing_keys: HashSet<(YearMonth, &str)> = existing
        .iter()
        .map(|visit| (visit.year_month(), visit.executive.as_str()))
        .collect();

    let mut overlaps = OverlapMap::new();
    for draft in incoming {
        let month = draft.year_month();
        if existing_keys.contains(&(month, draft.executive.as_str())) {
            overlaps
                .entry(month)
                .or_default()
                .insert(draft.executive.clone());
        }
    }
    overlaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Activity;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn draft(y: i32, m: u32, d: u32, executive: &str) -> VisitDraft {
        VisitDraft {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            executive: executive.to_string(),
            agent: None,
            chain: "Olímpica".into(),
            pdv_detail: "SAO 80".into(),
            city: "Barranquilla".into(),
            zone: "Costa".into(),
            activity: Activity::Visit,
            channel: "Moderno".into(),
            budget: Decimal::ZERO,
            expected_attendance: None,
            material_delivery_date: None,
            delivery_place: None,
            objective: None,
            sample_count: None,
            material_pop: None,
            other_materials: None,
        }
    }

    fn stored(y: i32, m: u32, d: u32, executive: &str) -> Visit {
        Visit::from_draft(Uuid::new_v4(), draft(y, m, d, executive))
    }

    fn month(y: i32, m: u32) -> YearMonth {
        YearMonth::new(y, m).unwrap()
    }

    #[test]
    fn reports_only_colliding_executives() {
        let incoming = vec![
            draft(2024, 8, 3, "Ana"),
            draft(2024, 8, 20, "Ana"),
            draft(2024, 8, 5, "Luis"),
        ];
        let existing = vec![stored(2024, 8, 1, "Ana")];

        let overlaps = find_overlaps(&incoming, &existing);

        let mut expected = OverlapMap::new();
        expected.insert(month(2024, 8), BTreeSet::from(["Ana".to_string()]));
        assert_eq!(overlaps, expected);
    }

    #[test]
    fn one_sided_pairs_are_omitted() {
        let incoming = vec![draft(2024, 9, 1, "Ana"), draft(2024, 8, 1, "Luis")];
        let existing = vec![stored(2024, 8, 1, "Ana"), stored(2024, 9, 1, "Luis")];

        assert!(find_overlaps(&incoming, &existing).is_empty());
    }

    #[test]
    fn same_month_of_other_year_does_not_collide() {
        let incoming = vec![draft(2025, 8, 1, "Ana")];
        let existing = vec![stored(2024, 8, 1, "Ana")];

        assert!(find_overlaps(&incoming, &existing).is_empty());
    }

    #[test]
    fn groups_several_months_and_executives() {
        let incoming = vec![
            draft(2024, 8, 1, "Ana"),
            draft(2024, 8, 2, "Luis"),
            draft(2024, 9, 1, "Ana"),
            draft(2024, 10, 1, "Marta"),
        ];
        let existing = vec![
            stored(2024, 8, 30, "Ana"),
            stored(2024, 8, 30, "Luis"),
            stored(2024, 9, 15, "Ana"),
        ];

        let overlaps = find_overlaps(&incoming, &existing);

        assert_eq!(overlaps.len(), 2);
        assert_eq!(
            overlaps[&month(2024, 8)],
            BTreeSet::from(["Ana".to_string(), "Luis".to_string()])
        );
        assert_eq!(overlaps[&month(2024, 9)], BTreeSet::from(["Ana".to_string()]));
    }

    #[test]
    fn result_does_not_depend_on_input_order() {
        let mut incoming = vec![
            draft(2024, 8, 1, "Ana"),
            draft(2024, 9, 2, "Luis"),
            draft(2024, 8, 9, "Marta"),
            draft(2024, 8, 11, "Ana"),
        ];
        let mut existing = vec![
            stored(2024, 9, 30, "Luis"),
            stored(2024, 8, 30, "Ana"),
            stored(2024, 8, 2, "Marta"),
        ];

        let forward = find_overlaps(&incoming, &existing);
        incoming.reverse();
        existing.reverse();
        let backward = find_overlaps(&incoming, &existing);
        incoming.rotate_left(1);
        existing.rotate_left(2);
        let rotated = find_overlaps(&incoming, &existing);

        assert_eq!(forward, backward);
        assert_eq!(forward, rotated);
    }

    #[test]
    fn empty_inputs_give_empty_map() {
        assert!(find_overlaps(&[], &[stored(2024, 8, 1, "Ana")]).is_empty());
        assert!(find_overlaps(&[draft(2024, 8, 1, "Ana")], &[]).is_empty());
    }
}
