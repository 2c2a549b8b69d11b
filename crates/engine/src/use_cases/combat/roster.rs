//! Encounter roster operations: add, patch, damage/heal and remove combatants.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use combatdesk_domain::turn_order::all_have_initiative;
use combatdesk_domain::{
    CampaignId, Combatant, CombatantId, CombatantPatch, EncounterId, HpDelta, HpMode, InpcId, MonsterId,
    Player, PlayerId,
};
use combatdesk_shared::CombatantView;

use super::effects::{EffectRunner, Effects, Mutation};
use super::error::CombatError;
use super::projector::{project_one, project_roster, write_stats, StatWrite};
use super::session::{is_started, open_session, reconcile_roster};
use crate::infrastructure::ports::{ClockPort, CompendiumPort};
use crate::stores::{TrackerState, TrackerStore};

pub const MIN_MONSTER_QTY: i64 = 1;
pub const MAX_MONSTER_QTY: i64 = 20;

fn encounter_campaign(
    state: &TrackerState,
    encounter_id: EncounterId,
) -> Result<CampaignId, CombatError> {
    state
        .encounter(encounter_id)
        .map(|e| e.campaign_id)
        .ok_or_else(|| CombatError::not_found("Encounter", encounter_id))
}

pub fn list_combatants(
    state: &TrackerState,
    encounter_id: EncounterId,
) -> Result<Vec<CombatantView>, CombatError> {
    encounter_campaign(state, encounter_id)?;
    Ok(project_roster(state, encounter_id))
}

/// Append rows, then start or repair turn state.
fn push_rows(
    state: &mut TrackerState,
    encounter_id: EncounterId,
    rows: Vec<Combatant>,
    now: DateTime<Utc>,
) -> Result<Mutation<Vec<CombatantView>>, CombatError> {
    if rows.is_empty() {
        return Ok(Mutation::unchanged(project_roster(state, encounter_id)));
    }
    let was_started = is_started(state, encounter_id);
    let added = rows.len();
    open_session(state, encounter_id)?.combatants.extend(rows);

    let mut effects = Effects::none();
    effects.combatants_changed(encounter_id);
    reconcile_roster(state, encounter_id, was_started, now, &mut effects)?;
    tracing::info!(encounter_id = %encounter_id, added, "Combatants added");
    Ok(Mutation::new(project_roster(state, encounter_id), effects))
}

/// Add every campaign player not already in the encounter.
pub fn add_all_players(
    state: &mut TrackerState,
    encounter_id: EncounterId,
    now: DateTime<Utc>,
) -> Result<Mutation<Vec<CombatantView>>, CombatError> {
    let campaign_id = encounter_campaign(state, encounter_id)?;
    let session = state.session(encounter_id);
    let mut players: Vec<&Player> = state
        .players_in(campaign_id)
        .filter(|p| !session.is_some_and(|s| s.contains_player(p.id)))
        .collect();
    players.sort_by_key(|p| p.character_name.to_lowercase());

    let rows = players
        .into_iter()
        .map(|p| Combatant::for_player(encounter_id, p, now))
        .collect();
    push_rows(state, encounter_id, rows, now)
}

/// Add one player. A player already in the encounter is left alone.
pub fn add_player(
    state: &mut TrackerState,
    encounter_id: EncounterId,
    player_id: PlayerId,
    now: DateTime<Utc>,
) -> Result<Mutation<Vec<CombatantView>>, CombatError> {
    let campaign_id = encounter_campaign(state, encounter_id)?;
    let player = state
        .player(player_id)
        .ok_or_else(|| CombatError::not_found("Player", player_id))?;
    if player.campaign_id != campaign_id {
        return Err(CombatError::invalid(
            "Player belongs to a different campaign",
        ));
    }
    if state
        .session(encounter_id)
        .is_some_and(|s| s.contains_player(player_id))
    {
        tracing::debug!(encounter_id = %encounter_id, player_id = %player_id, "Player already in encounter");
        return Ok(Mutation::unchanged(project_roster(state, encounter_id)));
    }

    let row = Combatant::for_player(encounter_id, player, now);
    push_rows(state, encounter_id, vec![row], now)
}

/// Highest `N` among labels of the form `"{stem} N"`.
fn highest_label_number(state: &TrackerState, encounter_id: EncounterId, stem: &str) -> u32 {
    state
        .session(encounter_id)
        .map(|s| {
            s.combatants
                .iter()
                .filter_map(|c| {
                    c.label
                        .strip_prefix(stem)?
                        .strip_prefix(' ')?
                        .parse::<u32>()
                        .ok()
                })
                .max()
                .unwrap_or(0)
        })
        .unwrap_or(0)
}

/// Add `qty` copies of a compendium monster, numbered after any existing
/// copies with the same label stem.
pub fn add_monsters(
    state: &mut TrackerState,
    encounter_id: EncounterId,
    monster_id: MonsterId,
    qty: Option<i64>,
    label: Option<&str>,
    compendium: &dyn CompendiumPort,
    now: DateTime<Utc>,
) -> Result<Mutation<Vec<CombatantView>>, CombatError> {
    encounter_campaign(state, encounter_id)?;
    let template = compendium
        .monster(monster_id)
        .ok_or_else(|| CombatError::not_found("Monster", monster_id))?;

    let qty = qty
        .unwrap_or(MIN_MONSTER_QTY)
        .clamp(MIN_MONSTER_QTY, MAX_MONSTER_QTY) as u32;
    let stem = label
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(template.name.trim())
        .to_string();
    let start = highest_label_number(state, encounter_id, &stem);

    let rows = (1..=qty)
        .map(|n| {
            Combatant::for_monster(encounter_id, &template, format!("{stem} {}", start + n), now)
        })
        .collect();
    push_rows(state, encounter_id, rows, now)
}

/// Add an iNPC instance. An iNPC already in the encounter is left alone.
pub fn add_inpc(
    state: &mut TrackerState,
    encounter_id: EncounterId,
    inpc_id: InpcId,
    compendium: &dyn CompendiumPort,
    now: DateTime<Utc>,
) -> Result<Mutation<Vec<CombatantView>>, CombatError> {
    let campaign_id = encounter_campaign(state, encounter_id)?;
    let inpc = state
        .inpc(inpc_id)
        .ok_or_else(|| CombatError::not_found("Inpc", inpc_id))?;
    if inpc.campaign_id != campaign_id {
        return Err(CombatError::invalid("iNPC belongs to a different campaign"));
    }
    let already_present = state.session(encounter_id).is_some_and(|s| {
        s.combatants
            .iter()
            .any(|c| c.base.inpc_id() == Some(inpc_id))
    });
    if already_present {
        tracing::debug!(encounter_id = %encounter_id, inpc_id = %inpc_id, "iNPC already in encounter");
        return Ok(Mutation::unchanged(project_roster(state, encounter_id)));
    }

    let template = inpc.monster_id.and_then(|id| compendium.monster(id));
    let row = Combatant::for_inpc(encounter_id, inpc, template.as_ref(), now);
    push_rows(state, encounter_id, vec![row], now)
}

/// Fully partial update of one combatant.
///
/// Display fields land on the row; stat fields go through the player
/// write-back rule.
pub fn patch_combatant(
    state: &mut TrackerState,
    encounter_id: EncounterId,
    combatant_id: CombatantId,
    patch: &CombatantPatch,
    now: DateTime<Utc>,
) -> Result<Mutation<CombatantView>, CombatError> {
    encounter_campaign(state, encounter_id)?;
    let was_started = is_started(state, encounter_id);
    let row = state
        .session_mut(encounter_id)
        .and_then(|s| s.combatant_mut(combatant_id))
        .ok_or_else(|| CombatError::not_found("Combatant", combatant_id))?;

    let mut effects = Effects::none();
    let before = row.clone();
    row.apply_display(patch);
    if *row != before {
        effects.combatants_changed(encounter_id);
    }
    if !patch.stats.is_empty() {
        write_stats(
            state,
            encounter_id,
            combatant_id,
            StatWrite::Patch(&patch.stats),
            now,
            &mut effects,
        )?;
    }
    if patch.touches_initiative() {
        reconcile_roster(state, encounter_id, was_started, now, &mut effects)?;
    }

    if !effects.is_empty() {
        tracing::info!(encounter_id = %encounter_id, combatant_id = %combatant_id, "Combatant patched");
    }
    Ok(Mutation::new(
        project_one(state, encounter_id, combatant_id)?,
        effects,
    ))
}

/// Apply free-text damage or healing. Unparseable or zero input is a no-op.
pub fn apply_hp(
    state: &mut TrackerState,
    encounter_id: EncounterId,
    combatant_id: CombatantId,
    input: &str,
    mode: HpMode,
    now: DateTime<Utc>,
) -> Result<Mutation<CombatantView>, CombatError> {
    encounter_campaign(state, encounter_id)?;
    let view = project_one(state, encounter_id, combatant_id)?;

    let delta = match HpDelta::parse(input, mode) {
        Ok(delta) => delta,
        Err(e) => {
            tracing::debug!(combatant_id = %combatant_id, input, error = %e, "Ignoring hp input");
            return Ok(Mutation::unchanged(view));
        }
    };

    let mut effects = Effects::none();
    write_stats(
        state,
        encounter_id,
        combatant_id,
        StatWrite::Delta(delta),
        now,
        &mut effects,
    )?;
    tracing::info!(
        encounter_id = %encounter_id,
        combatant_id = %combatant_id,
        mode = %delta.mode,
        amount = delta.amount,
        "Hp changed"
    );
    Ok(Mutation::new(
        project_one(state, encounter_id, combatant_id)?,
        effects,
    ))
}

pub fn remove_combatant(
    state: &mut TrackerState,
    encounter_id: EncounterId,
    combatant_id: CombatantId,
    now: DateTime<Utc>,
) -> Result<Mutation<Vec<CombatantView>>, CombatError> {
    encounter_campaign(state, encounter_id)?;
    let was_started = is_started(state, encounter_id);
    let session = state
        .session_mut(encounter_id)
        .ok_or_else(|| CombatError::not_found("Combatant", combatant_id))?;
    let index = session
        .combatants
        .iter()
        .position(|c| c.id == combatant_id)
        .ok_or_else(|| CombatError::not_found("Combatant", combatant_id))?;
    session.combatants.remove(index);

    let mut effects = Effects::none();
    effects.combatants_changed(encounter_id);
    reconcile_roster(state, encounter_id, was_started, now, &mut effects)?;
    tracing::info!(encounter_id = %encounter_id, combatant_id = %combatant_id, "Combatant removed");
    Ok(Mutation::new(project_roster(state, encounter_id), effects))
}

/// Remove every row matching `predicate` across all sessions, repairing turn
/// state in each encounter that lost a row. Used by base-record deletes.
pub fn purge_rows(
    state: &mut TrackerState,
    predicate: impl Fn(&Combatant) -> bool,
    now: DateTime<Utc>,
    effects: &mut Effects,
) -> Result<Vec<EncounterId>, CombatError> {
    let mut touched = Vec::new();
    for session in state.sessions.iter_mut() {
        let was_started = all_have_initiative(&session.combatants);
        let before = session.combatants.len();
        session.combatants.retain(|c| !predicate(c));
        if session.combatants.len() != before {
            touched.push((session.encounter_id, was_started));
        }
    }

    for (encounter_id, was_started) in &touched {
        effects.combatants_changed(*encounter_id);
        if state.encounter(*encounter_id).is_some() {
            reconcile_roster(state, *encounter_id, *was_started, now, effects)?;
        }
    }
    Ok(touched.into_iter().map(|(id, _)| id).collect())
}

/// Roster use cases bound to the store and side-effect runner.
pub struct RosterOps {
    store: TrackerStore,
    effects: Arc<EffectRunner>,
    compendium: Arc<dyn CompendiumPort>,
    clock: Arc<dyn ClockPort>,
}

impl RosterOps {
    pub fn new(
        store: TrackerStore,
        effects: Arc<EffectRunner>,
        compendium: Arc<dyn CompendiumPort>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            store,
            effects,
            compendium,
            clock,
        }
    }

    pub async fn list(&self, encounter_id: EncounterId) -> Result<Vec<CombatantView>, CombatError> {
        self.store
            .read(|s| list_combatants(s, encounter_id))
            .await
    }

    pub async fn add_all_players(
        &self,
        encounter_id: EncounterId,
    ) -> Result<Vec<CombatantView>, CombatError> {
        let now = self.clock.now();
        let mutation = self
            .store
            .mutate(|s| add_all_players(s, encounter_id, now))
            .await?;
        Ok(self.effects.run(mutation).await)
    }

    pub async fn add_player(
        &self,
        encounter_id: EncounterId,
        player_id: PlayerId,
    ) -> Result<Vec<CombatantView>, CombatError> {
        let now = self.clock.now();
        let mutation = self
            .store
            .mutate(|s| add_player(s, encounter_id, player_id, now))
            .await?;
        Ok(self.effects.run(mutation).await)
    }

    pub async fn add_monsters(
        &self,
        encounter_id: EncounterId,
        monster_id: MonsterId,
        qty: Option<i64>,
        label: Option<String>,
    ) -> Result<Vec<CombatantView>, CombatError> {
        let now = self.clock.now();
        let compendium = self.compendium.as_ref();
        let mutation = self
            .store
            .mutate(|s| {
                add_monsters(
                    s,
                    encounter_id,
                    monster_id,
                    qty,
                    label.as_deref(),
                    compendium,
                    now,
                )
            })
            .await?;
        Ok(self.effects.run(mutation).await)
    }

    pub async fn add_inpc(
        &self,
        encounter_id: EncounterId,
        inpc_id: InpcId,
    ) -> Result<Vec<CombatantView>, CombatError> {
        let now = self.clock.now();
        let compendium = self.compendium.as_ref();
        let mutation = self
            .store
            .mutate(|s| add_inpc(s, encounter_id, inpc_id, compendium, now))
            .await?;
        Ok(self.effects.run(mutation).await)
    }

    pub async fn patch(
        &self,
        encounter_id: EncounterId,
        combatant_id: CombatantId,
        patch: CombatantPatch,
    ) -> Result<CombatantView, CombatError> {
        let now = self.clock.now();
        let mutation = self
            .store
            .mutate(|s| patch_combatant(s, encounter_id, combatant_id, &patch, now))
            .await?;
        Ok(self.effects.run(mutation).await)
    }

    pub async fn apply_hp(
        &self,
        encounter_id: EncounterId,
        combatant_id: CombatantId,
        input: &str,
        mode: HpMode,
    ) -> Result<CombatantView, CombatError> {
        let now = self.clock.now();
        let mutation = self
            .store
            .mutate(|s| apply_hp(s, encounter_id, combatant_id, input, mode, now))
            .await?;
        Ok(self.effects.run(mutation).await)
    }

    pub async fn remove(
        &self,
        encounter_id: EncounterId,
        combatant_id: CombatantId,
    ) -> Result<Vec<CombatantView>, CombatError> {
        let now = self.clock.now();
        let mutation = self
            .store
            .mutate(|s| remove_combatant(s, encounter_id, combatant_id, now))
            .await?;
        Ok(self.effects.run(mutation).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::ports::{MockBroadcastPort, MockCompendiumPort, MockPersistencePort};
    use combatdesk_domain::{Encounter, EncounterStatus, Inpc, MonsterTemplate, StatsPatch};
    use combatdesk_shared::Topic;

    struct Fixture {
        state: TrackerState,
        encounter_id: EncounterId,
        campaign_id: CampaignId,
    }

    fn fixture() -> Fixture {
        let now = Utc::now();
        let campaign_id = CampaignId::new();
        let mut state = TrackerState::default();
        let encounter = Encounter::new(campaign_id, "Bridge", now);
        let encounter_id = encounter.id;
        state.encounters.push(encounter);
        state
            .players
            .push(Player::new(campaign_id, "zora", "Ana", 20, 14, now));
        state
            .players
            .push(Player::new(campaign_id, "Brom", "Lee", 30, 16, now));
        Fixture {
            state,
            encounter_id,
            campaign_id,
        }
    }

    fn goblin_template() -> MonsterTemplate {
        MonsterTemplate {
            id: MonsterId::new(),
            name: "Goblin".into(),
            ac: 15,
            hp: 7,
            attacks: serde_json::Value::Null,
        }
    }

    fn compendium_with(template: MonsterTemplate) -> MockCompendiumPort {
        let mut compendium = MockCompendiumPort::new();
        compendium
            .expect_monster()
            .returning(move |id| (id == template.id).then(|| template.clone()));
        compendium
    }

    #[test]
    fn add_all_players_sorts_and_skips_present() {
        let mut f = fixture();
        let now = Utc::now();
        let first = add_all_players(&mut f.state, f.encounter_id, now).unwrap();
        let names: Vec<&str> = first.value.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Brom", "zora"]);
        assert!(first.effects.persist);

        let second = add_all_players(&mut f.state, f.encounter_id, now).unwrap();
        assert_eq!(second.value.len(), 2);
        assert!(second.effects.is_empty());
    }

    #[test]
    fn add_player_from_other_campaign_is_rejected() {
        let mut f = fixture();
        let stranger = Player::new(CampaignId::new(), "Vex", "Kim", 10, 12, Utc::now());
        let stranger_id = stranger.id;
        f.state.players.push(stranger);
        let err = add_player(&mut f.state, f.encounter_id, stranger_id, Utc::now()).unwrap_err();
        assert!(matches!(err, CombatError::InvalidInput(_)));
        assert!(f.state.sessions.is_empty());
    }

    #[test]
    fn monster_labels_continue_numbering() {
        let mut f = fixture();
        let template = goblin_template();
        let compendium = compendium_with(template.clone());
        let now = Utc::now();

        add_monsters(&mut f.state, f.encounter_id, template.id, Some(2), None, &compendium, now)
            .unwrap();
        let roster = add_monsters(
            &mut f.state,
            f.encounter_id,
            template.id,
            Some(1),
            Some("  "),
            &compendium,
            now,
        )
        .unwrap()
        .value;
        let labels: Vec<&str> = roster.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, ["Goblin 1", "Goblin 2", "Goblin 3"]);
    }

    #[test]
    fn monster_quantity_is_clamped() {
        let mut f = fixture();
        let template = goblin_template();
        let compendium = compendium_with(template.clone());
        let roster = add_monsters(
            &mut f.state,
            f.encounter_id,
            template.id,
            Some(500),
            Some("Wolf"),
            &compendium,
            Utc::now(),
        )
        .unwrap()
        .value;
        assert_eq!(roster.len(), 20);
        assert_eq!(roster[19].label, "Wolf 20");

        let roster = add_monsters(
            &mut f.state,
            f.encounter_id,
            template.id,
            Some(-3),
            Some("Wolf"),
            &compendium,
            Utc::now(),
        )
        .unwrap()
        .value;
        assert_eq!(roster.len(), 21);
    }

    #[test]
    fn unknown_monster_is_not_found() {
        let mut f = fixture();
        let compendium = compendium_with(goblin_template());
        let err = add_monsters(
            &mut f.state,
            f.encounter_id,
            MonsterId::new(),
            None,
            None,
            &compendium,
            Utc::now(),
        )
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn add_inpc_uses_template_attacks_once() {
        let mut f = fixture();
        let mut template = goblin_template();
        template.attacks = serde_json::json!([{ "name": "Bite" }]);
        let inpc = Inpc::new(f.campaign_id, "Grik", 22, 13, Utc::now()).with_monster(template.id);
        let inpc_id = inpc.id;
        f.state.inpcs.push(inpc);
        let compendium = compendium_with(template);

        let roster = add_inpc(&mut f.state, f.encounter_id, inpc_id, &compendium, Utc::now())
            .unwrap()
            .value;
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].hp_max, 22);
        assert!(roster[0].friendly);
        assert!(roster[0].attack_overrides.is_some());

        let again = add_inpc(&mut f.state, f.encounter_id, inpc_id, &compendium, Utc::now())
            .unwrap();
        assert!(again.effects.is_empty());
    }

    #[test]
    fn last_initiative_flips_encounter_in_progress() {
        let mut f = fixture();
        let now = Utc::now();
        let roster = add_all_players(&mut f.state, f.encounter_id, now)
            .unwrap()
            .value;
        let (brom, zora) = (
            CombatantId::from_uuid(roster[0].id),
            CombatantId::from_uuid(roster[1].id),
        );

        let set_init = |value: f64| CombatantPatch {
            initiative: Some(Some(value)),
            ..Default::default()
        };
        let first = patch_combatant(&mut f.state, f.encounter_id, brom, &set_init(9.0), now).unwrap();
        assert!(!first.effects.events.iter().any(|e| e.topic == Topic::CombatChanged));

        let second =
            patch_combatant(&mut f.state, f.encounter_id, zora, &set_init(15.0), now).unwrap();
        let topics: Vec<Topic> = second.effects.events.iter().map(|e| e.topic).collect();
        assert!(topics.contains(&Topic::EncountersChanged));
        assert!(topics.contains(&Topic::CombatChanged));

        let encounter = f.state.encounter(f.encounter_id).unwrap();
        assert_eq!(encounter.status, EncounterStatus::InProgress);
        assert_eq!(encounter.combat.active_combatant_id, Some(zora));
    }

    #[test]
    fn patch_player_row_writes_back() {
        let mut f = fixture();
        let now = Utc::now();
        let roster = add_all_players(&mut f.state, f.encounter_id, now)
            .unwrap()
            .value;
        let brom = CombatantId::from_uuid(roster[0].id);
        let patch = CombatantPatch {
            label: Some("Brom the Bold".into()),
            stats: StatsPatch {
                hp_current: Some(11),
                ..Default::default()
            },
            ..Default::default()
        };

        let result = patch_combatant(&mut f.state, f.encounter_id, brom, &patch, now).unwrap();
        assert_eq!(result.value.hp_current, 11);
        assert_eq!(result.value.label, "Brom the Bold");
        let player_id = PlayerId::from_uuid(result.value.base_id);
        assert_eq!(f.state.player(player_id).unwrap().hp_current, 11);
        let topics: Vec<Topic> = result.effects.events.iter().map(|e| e.topic).collect();
        assert_eq!(topics, [Topic::CombatantsChanged, Topic::PlayersChanged]);
    }

    #[test]
    fn extreme_overrides_keep_the_roster_readable() {
        let mut f = fixture();
        let now = Utc::now();
        let roster = add_all_players(&mut f.state, f.encounter_id, now)
            .unwrap()
            .value;
        let brom = CombatantId::from_uuid(roster[0].id);
        let patch = CombatantPatch {
            stats: StatsPatch {
                overrides: Some(combatdesk_domain::OverridesPatch {
                    ac_bonus: Some(i32::MAX),
                    hp_max_override: Some(Some(i32::MAX)),
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        };

        let patched = patch_combatant(&mut f.state, f.encounter_id, brom, &patch, now).unwrap();
        assert_eq!(patched.value.effective_ac, i32::MAX);
        assert_eq!(patched.value.effective_hp_max, i32::MAX);

        let listed = list_combatants(&f.state, f.encounter_id).unwrap();
        assert!(listed.iter().any(|c| c.effective_ac == i32::MAX));

        let healed = apply_hp(&mut f.state, f.encounter_id, brom, "+1000", HpMode::Damage, now)
            .unwrap();
        assert_eq!(healed.value.hp_current, 30 + 1000);
    }

    #[test]
    fn invalid_hp_input_is_a_noop() {
        let mut f = fixture();
        let template = goblin_template();
        let compendium = compendium_with(template.clone());
        let roster = add_monsters(
            &mut f.state,
            f.encounter_id,
            template.id,
            None,
            None,
            &compendium,
            Utc::now(),
        )
        .unwrap()
        .value;
        let goblin = CombatantId::from_uuid(roster[0].id);

        for input in ["", "abc", "0"] {
            let result = apply_hp(
                &mut f.state,
                f.encounter_id,
                goblin,
                input,
                HpMode::Damage,
                Utc::now(),
            )
            .unwrap();
            assert!(result.effects.is_empty());
            assert_eq!(result.value.hp_current, 7);
        }

        let result = apply_hp(
            &mut f.state,
            f.encounter_id,
            goblin,
            "4",
            HpMode::Damage,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(result.value.hp_current, 3);
    }

    #[test]
    fn removing_active_combatant_repairs_pointer() {
        let mut f = fixture();
        let now = Utc::now();
        let roster = add_all_players(&mut f.state, f.encounter_id, now)
            .unwrap()
            .value;
        for (view, init) in roster.iter().zip([12.0, 8.0]) {
            patch_combatant(
                &mut f.state,
                f.encounter_id,
                CombatantId::from_uuid(view.id),
                &CombatantPatch {
                    initiative: Some(Some(init)),
                    ..Default::default()
                },
                now,
            )
            .unwrap();
        }
        let brom = CombatantId::from_uuid(roster[0].id);
        let zora = CombatantId::from_uuid(roster[1].id);
        assert_eq!(
            f.state.encounter(f.encounter_id).unwrap().combat.active_combatant_id,
            Some(brom)
        );

        let result = remove_combatant(&mut f.state, f.encounter_id, brom, now).unwrap();
        assert_eq!(result.value.len(), 1);
        assert_eq!(
            f.state.encounter(f.encounter_id).unwrap().combat.active_combatant_id,
            Some(zora)
        );

        let err = remove_combatant(&mut f.state, f.encounter_id, brom, now).unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn ops_run_effects_after_mutation() {
        let f = fixture();
        let encounter_id = f.encounter_id;
        let store = TrackerStore::new(f.state);

        let mut persistence = MockPersistencePort::new();
        persistence.expect_schedule_save().times(1).returning(|| ());
        let mut broadcast = MockBroadcastPort::new();
        broadcast
            .expect_broadcast()
            .withf(move |topic, payload| {
                *topic == Topic::CombatantsChanged
                    && payload.encounter_id == Some(encounter_id.to_uuid())
            })
            .times(1)
            .returning(|_, _| ());

        let ops = RosterOps::new(
            store.clone(),
            Arc::new(EffectRunner::new(Arc::new(persistence), Arc::new(broadcast))),
            Arc::new(MockCompendiumPort::new()),
            Arc::new(FixedClock(Utc::now())),
        );
        let roster = ops.add_all_players(encounter_id).await.unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(ops.list(encounter_id).await.unwrap(), roster);
    }
}
