//! Plain-text rendering of the cached encounter.

use std::fmt::Write;

use crate::state::EncounterState;

/// Roster in turn order with the active (`>`) and target (`*`) markers.
pub fn render(state: &EncounterState) -> String {
    let mut out = String::new();
    let Some(encounter) = &state.encounter else {
        let _ = writeln!(out, "Encounter {} not loaded", state.encounter_id);
        return out;
    };

    let _ = writeln!(
        out,
        "{} [{}] - round {}",
        encounter.name, encounter.status, state.combat.round
    );
    if !state.is_started() && !state.roster.is_empty() {
        let _ = writeln!(out, "(waiting for initiative)");
    }

    for c in state.ordered() {
        let active = if state.combat.active_combatant_id == Some(c.id) { '>' } else { ' ' };
        let target = if state.target_id == Some(c.id) { '*' } else { ' ' };
        let initiative = match c.initiative {
            Some(v) if v != 0.0 => format!("{v:>4}"),
            _ => "   -".to_string(),
        };
        let _ = write!(
            out,
            "{active}{target} {initiative}  {:<20} HP {}/{} AC {}",
            c.display_name(),
            c.hp_current,
            c.effective_hp_max,
            c.effective_ac
        );
        if !c.conditions.is_empty() {
            let names: Vec<&str> = c.conditions.iter().map(|k| k.key.as_str()).collect();
            let _ = write!(out, "  [{}]", names.join(", "));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use combatdesk_shared::{CombatStateData, EncounterData};
    use uuid::Uuid;

    use crate::state::encounter_state::tests::view;

    #[test]
    fn marks_active_and_target() {
        let encounter_id = Uuid::new_v4();
        let mut state = EncounterState::new(encounter_id);
        assert!(render(&state).contains("not loaded"));

        state.replace_encounter(Some(EncounterData {
            id: encounter_id,
            campaign_id: Uuid::new_v4(),
            name: "Bridge".into(),
            status: "In Progress".into(),
            combat: CombatStateData::default(),
            created_at: Utc::now(),
        }));
        let mut orc = view("Orc", Some(18.0), 9, "monster");
        orc.label = "Orc 1".into();
        let ilsa = view("Ilsa", Some(12.0), 20, "player");
        state.combat.active_combatant_id = Some(orc.id);
        state.target_id = Some(ilsa.id);
        state.replace_roster(vec![ilsa, orc]);

        let text = render(&state);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Bridge [In Progress] - round 1");
        assert!(lines[1].starts_with("> ") && lines[1].contains("Orc 1"));
        assert!(lines[2].starts_with(" *") && lines[2].contains("Ilsa"));
    }
}
