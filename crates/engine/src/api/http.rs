//! HTTP routes.
//!
//! Handlers stay thin: parse ids and bodies, call one use case, return JSON.
//! Write endpoints answer with the merged combatant view or the resulting
//! combat state so the caller never needs a second round trip.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use uuid::Uuid;

use combatdesk_domain::{
    CampaignId, CombatantId, EncounterId, InpcId, MonsterId, MonsterTemplate, PlayerId,
};
use combatdesk_shared::{
    AddInpcRequest, AddMonstersRequest, AddPlayerRequest, CampaignData, CombatStateData,
    CombatantView, CreateCampaignRequest, CreateEncounterRequest, CreateInpcRequest,
    CreatePlayerRequest, EncounterData, FullRestResult, HpDeltaRequest, InpcData,
    PatchCombatantRequest, PatchPlayerRequest, PlayerData, SetCombatStateRequest,
};

use crate::app::App;
use crate::use_cases::combat::CombatError;

/// Create all HTTP routes.
pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/", get(health))
        .route("/api/health", get(health))
        .route("/api/monsters", get(list_monsters))
        // Base records
        .route("/api/campaigns", get(list_campaigns).post(create_campaign))
        .route("/api/campaigns/{id}", axum::routing::delete(delete_campaign))
        .route(
            "/api/campaigns/{id}/players",
            get(list_players).post(create_player),
        )
        .route(
            "/api/players/{id}",
            axum::routing::patch(patch_player).delete(delete_player),
        )
        .route(
            "/api/campaigns/{id}/inpcs",
            get(list_inpcs).post(create_inpc),
        )
        .route("/api/inpcs/{id}", axum::routing::delete(delete_inpc))
        .route(
            "/api/campaigns/{id}/encounters",
            get(list_encounters).post(create_encounter),
        )
        .route(
            "/api/encounters/{id}",
            get(get_encounter).delete(delete_encounter),
        )
        .route("/api/campaigns/{id}/full-rest", post(full_rest))
        // Roster
        .route("/api/encounters/{id}/combatants", get(list_combatants))
        .route(
            "/api/encounters/{id}/combatants/players",
            post(add_all_players),
        )
        .route("/api/encounters/{id}/combatants/player", post(add_player))
        .route(
            "/api/encounters/{id}/combatants/monsters",
            post(add_monsters),
        )
        .route("/api/encounters/{id}/combatants/inpc", post(add_inpc))
        .route(
            "/api/encounters/{id}/combatants/{cid}",
            axum::routing::patch(patch_combatant).delete(remove_combatant),
        )
        .route(
            "/api/encounters/{id}/combatants/{cid}/hp",
            post(apply_hp),
        )
        // Turn state
        .route(
            "/api/encounters/{id}/combat",
            get(get_combat).put(set_combat),
        )
        .route("/api/encounters/{id}/combat/next", post(next_turn))
        .route("/api/encounters/{id}/combat/prev", post(prev_turn))
        .route("/api/encounters/{id}/reset", post(reset_fight))
        .route("/api/encounters/{id}/end", post(end_combat))
}

async fn health() -> &'static str {
    "OK"
}

async fn list_monsters(State(app): State<Arc<App>>) -> Json<Vec<MonsterTemplate>> {
    let mut monsters = app.compendium.list();
    monsters.sort_by_key(|m| m.name.to_lowercase());
    Json(monsters)
}

// =============================================================================
// Campaigns
// =============================================================================

async fn list_campaigns(State(app): State<Arc<App>>) -> Json<Vec<CampaignData>> {
    Json(app.use_cases.management.campaigns.list().await)
}

async fn create_campaign(
    State(app): State<Arc<App>>,
    Json(body): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<CampaignData>), ApiError> {
    let campaign = app.use_cases.management.campaigns.create(&body.name).await?;
    Ok((StatusCode::CREATED, Json(campaign)))
}

async fn delete_campaign(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app.use_cases
        .management
        .campaigns
        .delete(CampaignId::from_uuid(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn full_rest(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<FullRestResult>, ApiError> {
    let result = app
        .use_cases
        .combat
        .rest
        .full_rest(CampaignId::from_uuid(id))
        .await?;
    Ok(Json(result))
}

// =============================================================================
// Players
// =============================================================================

async fn list_players(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PlayerData>>, ApiError> {
    let players = app
        .use_cases
        .management
        .players
        .list(CampaignId::from_uuid(id))
        .await?;
    Ok(Json(players))
}

async fn create_player(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(body): Json<CreatePlayerRequest>,
) -> Result<(StatusCode, Json<PlayerData>), ApiError> {
    let player = app
        .use_cases
        .management
        .players
        .create(CampaignId::from_uuid(id), body)
        .await?;
    Ok((StatusCode::CREATED, Json(player)))
}

async fn patch_player(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(body): Json<PatchPlayerRequest>,
) -> Result<Json<PlayerData>, ApiError> {
    let player = app
        .use_cases
        .management
        .players
        .update(PlayerId::from_uuid(id), body)
        .await?;
    Ok(Json(player))
}

async fn delete_player(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app.use_cases
        .management
        .players
        .delete(PlayerId::from_uuid(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// iNPCs
// =============================================================================

async fn list_inpcs(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<InpcData>>, ApiError> {
    let inpcs = app
        .use_cases
        .management
        .inpcs
        .list(CampaignId::from_uuid(id))
        .await?;
    Ok(Json(inpcs))
}

async fn create_inpc(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(body): Json<CreateInpcRequest>,
) -> Result<(StatusCode, Json<InpcData>), ApiError> {
    let inpc = app
        .use_cases
        .management
        .inpcs
        .create(CampaignId::from_uuid(id), body)
        .await?;
    Ok((StatusCode::CREATED, Json(inpc)))
}

async fn delete_inpc(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app.use_cases
        .management
        .inpcs
        .delete(InpcId::from_uuid(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Encounters
// =============================================================================

async fn list_encounters(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<EncounterData>>, ApiError> {
    let encounters = app
        .use_cases
        .management
        .encounters
        .list(CampaignId::from_uuid(id))
        .await?;
    Ok(Json(encounters))
}

async fn create_encounter(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(body): Json<CreateEncounterRequest>,
) -> Result<(StatusCode, Json<EncounterData>), ApiError> {
    let encounter = app
        .use_cases
        .management
        .encounters
        .create(CampaignId::from_uuid(id), &body.name)
        .await?;
    Ok((StatusCode::CREATED, Json(encounter)))
}

async fn get_encounter(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<EncounterData>, ApiError> {
    let encounter = app
        .use_cases
        .management
        .encounters
        .get(EncounterId::from_uuid(id))
        .await?;
    Ok(Json(encounter))
}

async fn delete_encounter(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app.use_cases
        .management
        .encounters
        .delete(EncounterId::from_uuid(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Roster
// =============================================================================

async fn list_combatants(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<CombatantView>>, ApiError> {
    let roster = app
        .use_cases
        .combat
        .roster
        .list(EncounterId::from_uuid(id))
        .await?;
    Ok(Json(roster))
}

async fn add_all_players(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<CombatantView>>, ApiError> {
    let added = app
        .use_cases
        .combat
        .roster
        .add_all_players(EncounterId::from_uuid(id))
        .await?;
    Ok(Json(added))
}

async fn add_player(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(body): Json<AddPlayerRequest>,
) -> Result<Json<Vec<CombatantView>>, ApiError> {
    let added = app
        .use_cases
        .combat
        .roster
        .add_player(
            EncounterId::from_uuid(id),
            PlayerId::from_uuid(body.player_id),
        )
        .await?;
    Ok(Json(added))
}

async fn add_monsters(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(body): Json<AddMonstersRequest>,
) -> Result<Json<Vec<CombatantView>>, ApiError> {
    let added = app
        .use_cases
        .combat
        .roster
        .add_monsters(
            EncounterId::from_uuid(id),
            MonsterId::from_uuid(body.monster_id),
            body.qty,
            body.label,
        )
        .await?;
    Ok(Json(added))
}

async fn add_inpc(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(body): Json<AddInpcRequest>,
) -> Result<Json<Vec<CombatantView>>, ApiError> {
    let added = app
        .use_cases
        .combat
        .roster
        .add_inpc(EncounterId::from_uuid(id), InpcId::from_uuid(body.inpc_id))
        .await?;
    Ok(Json(added))
}

async fn patch_combatant(
    State(app): State<Arc<App>>,
    Path((id, cid)): Path<(Uuid, Uuid)>,
    Json(body): Json<PatchCombatantRequest>,
) -> Result<Json<CombatantView>, ApiError> {
    let view = app
        .use_cases
        .combat
        .roster
        .patch(
            EncounterId::from_uuid(id),
            CombatantId::from_uuid(cid),
            body.to_patch(),
        )
        .await?;
    Ok(Json(view))
}

async fn apply_hp(
    State(app): State<Arc<App>>,
    Path((id, cid)): Path<(Uuid, Uuid)>,
    Json(body): Json<HpDeltaRequest>,
) -> Result<Json<CombatantView>, ApiError> {
    let view = app
        .use_cases
        .combat
        .roster
        .apply_hp(
            EncounterId::from_uuid(id),
            CombatantId::from_uuid(cid),
            &body.input,
            body.mode,
        )
        .await?;
    Ok(Json(view))
}

async fn remove_combatant(
    State(app): State<Arc<App>>,
    Path((id, cid)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<CombatantView>>, ApiError> {
    let roster = app
        .use_cases
        .combat
        .roster
        .remove(EncounterId::from_uuid(id), CombatantId::from_uuid(cid))
        .await?;
    Ok(Json(roster))
}

// =============================================================================
// Turn state
// =============================================================================

async fn get_combat(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CombatStateData>, ApiError> {
    let state = app
        .use_cases
        .combat
        .turns
        .get(EncounterId::from_uuid(id))
        .await?;
    Ok(Json(state))
}

async fn set_combat(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(body): Json<SetCombatStateRequest>,
) -> Result<Json<CombatStateData>, ApiError> {
    let active = body
        .active_combatant_id
        .map(|active| active.map(CombatantId::from_uuid));
    let state = app
        .use_cases
        .combat
        .turns
        .set(EncounterId::from_uuid(id), body.round, active)
        .await?;
    Ok(Json(state))
}

async fn next_turn(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CombatStateData>, ApiError> {
    let state = app
        .use_cases
        .combat
        .turns
        .next(EncounterId::from_uuid(id))
        .await?;
    Ok(Json(state))
}

async fn prev_turn(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CombatStateData>, ApiError> {
    let state = app
        .use_cases
        .combat
        .turns
        .prev(EncounterId::from_uuid(id))
        .await?;
    Ok(Json(state))
}

async fn reset_fight(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CombatStateData>, ApiError> {
    let state = app
        .use_cases
        .combat
        .turns
        .reset(EncounterId::from_uuid(id))
        .await?;
    Ok(Json(state))
}

async fn end_combat(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CombatStateData>, ApiError> {
    let state = app
        .use_cases
        .combat
        .turns
        .end(EncounterId::from_uuid(id))
        .await?;
    Ok(Json(state))
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    NotFound,
    BadRequest(String),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
        }
    }
}

impl From<CombatError> for ApiError {
    fn from(e: CombatError) -> Self {
        match e {
            CombatError::NotFound { .. } => ApiError::NotFound,
            CombatError::InvalidInput(msg) => ApiError::BadRequest(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::api::ConnectionManager;
    use crate::infrastructure::clock::SystemClock;
    use crate::infrastructure::compendium::JsonCompendium;
    use crate::infrastructure::ports::MockPersistencePort;
    use crate::stores::{TrackerState, TrackerStore};

    fn goblin() -> MonsterTemplate {
        MonsterTemplate {
            id: MonsterId::new(),
            name: "Goblin".into(),
            ac: 15,
            hp: 7,
            attacks: Value::Null,
        }
    }

    fn test_router(monsters: Vec<MonsterTemplate>) -> Router {
        let mut persistence = MockPersistencePort::new();
        persistence.expect_schedule_save().returning(|| ());
        let app = App::new(
            TrackerStore::new(TrackerState::default()),
            Arc::new(persistence),
            Arc::new(ConnectionManager::new()),
            Arc::new(JsonCompendium::from_monsters(monsters)),
            Arc::new(SystemClock::new()),
        );
        routes().with_state(Arc::new(app))
    }

    async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn encounter_with_campaign(router: &Router) -> (String, String) {
        let (_, campaign) = call(router, "POST", "/api/campaigns", Some(json!({"name": "Tomb"}))).await;
        let campaign_id = campaign["id"].as_str().unwrap().to_string();
        let (_, encounter) = call(
            router,
            "POST",
            &format!("/api/campaigns/{campaign_id}/encounters"),
            Some(json!({"name": "Gate"})),
        )
        .await;
        (campaign_id, encounter["id"].as_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn health_check() {
        let router = test_router(Vec::new());
        let response = router
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_encounter_is_404() {
        let router = test_router(Vec::new());
        let (status, _) = call(
            &router,
            "GET",
            &format!("/api/encounters/{}/combat", Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn blank_player_name_is_400() {
        let router = test_router(Vec::new());
        let (campaign_id, _) = encounter_with_campaign(&router).await;
        let (status, _) = call(
            &router,
            "POST",
            &format!("/api/campaigns/{campaign_id}/players"),
            Some(json!({"characterName": " "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn monsters_then_initiative_starts_combat() {
        let template = goblin();
        let monster_id = template.id.to_uuid();
        let router = test_router(vec![template]);
        let (_, encounter_id) = encounter_with_campaign(&router).await;

        let (status, added) = call(
            &router,
            "POST",
            &format!("/api/encounters/{encounter_id}/combatants/monsters"),
            Some(json!({"monsterId": monster_id, "qty": "2"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let added = added.as_array().unwrap().clone();
        assert_eq!(added.len(), 2);
        assert_eq!(added[0]["label"], "Goblin 1");

        let (_, combat) = call(&router, "GET", &format!("/api/encounters/{encounter_id}/combat"), None).await;
        assert_eq!(combat["activeCombatantId"], Value::Null);

        for (row, init) in added.iter().zip([12, 18]) {
            let (status, _) = call(
                &router,
                "PATCH",
                &format!("/api/encounters/{encounter_id}/combatants/{}", row["id"].as_str().unwrap()),
                Some(json!({"initiative": init})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (_, combat) = call(&router, "GET", &format!("/api/encounters/{encounter_id}/combat"), None).await;
        assert_eq!(combat["round"], 1);
        assert_eq!(combat["activeCombatantId"], added[1]["id"]);

        let (_, combat) = call(&router, "POST", &format!("/api/encounters/{encounter_id}/combat/next"), None).await;
        assert_eq!(combat["activeCombatantId"], added[0]["id"]);

        let (_, encounter) = call(&router, "GET", &format!("/api/encounters/{encounter_id}"), None).await;
        assert_eq!(encounter["status"], "In Progress");
    }

    #[tokio::test]
    async fn hp_input_and_monster_list() {
        let template = goblin();
        let monster_id = template.id.to_uuid();
        let router = test_router(vec![template]);
        let (_, encounter_id) = encounter_with_campaign(&router).await;

        let (_, monsters) = call(&router, "GET", "/api/monsters", None).await;
        assert_eq!(monsters[0]["name"], "Goblin");

        let (_, added) = call(
            &router,
            "POST",
            &format!("/api/encounters/{encounter_id}/combatants/monsters"),
            Some(json!({"monsterId": monster_id})),
        )
        .await;
        let cid = added[0]["id"].as_str().unwrap().to_string();

        let (status, view) = call(
            &router,
            "POST",
            &format!("/api/encounters/{encounter_id}/combatants/{cid}/hp"),
            Some(json!({"input": "-3"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["hpCurrent"], 4);

        let (status, view) = call(
            &router,
            "POST",
            &format!("/api/encounters/{encounter_id}/combatants/{cid}/hp"),
            Some(json!({"input": "lots"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["hpCurrent"], 4);
    }

    #[test]
    fn combat_errors_map_to_status() {
        assert!(matches!(
            ApiError::from(CombatError::not_found("Encounter", Uuid::nil())),
            ApiError::NotFound
        ));
        assert!(matches!(
            ApiError::from(CombatError::invalid("nope")),
            ApiError::BadRequest(_)
        ));
    }
}
