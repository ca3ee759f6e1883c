//! REST client for the Chess Union tournament API.

use crate::models::{
    AuthGrant, Credentials, Match, MatchId, Outcome, Player, PlayerId, ServiceError, Session,
    Stage, StagedEdit, Tournament, TournamentId,
};
use crate::remote::TournamentService;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Rounds hold at most one match per pair of players; the list endpoint is paged.
const MATCH_PAGE_SIZE: u32 = 500;

/// Tournament snapshot as returned by `GET /api/tournament/{id}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TournamentDto {
    id: TournamentId,
    #[serde(default)]
    name: String,
    stage: Stage,
    current_round: u32,
    amount_of_rounds: u32,
    min_amount_of_players: Option<u32>,
    max_amount_of_players: Option<u32>,
    #[serde(default)]
    players: Vec<PlayerDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerDto {
    id: PlayerId,
    full_name: String,
    #[serde(default)]
    rating: f64,
    #[serde(default)]
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchDto {
    id: MatchId,
    round_number: u32,
    white_player_name: String,
    black_player_name: String,
    result: Option<Outcome>,
}

/// Body of `PATCH /api/admin/match/{id}/setResult`.
#[derive(Debug, Serialize)]
struct SetResultRequest {
    result: Option<Outcome>,
}

fn set_result_path(id: MatchId) -> String {
    format!("/api/admin/match/{id}/setResult")
}

impl From<TournamentDto> for Tournament {
    fn from(dto: TournamentDto) -> Self {
        Tournament {
            id: dto.id,
            name: dto.name,
            stage: dto.stage,
            current_round: dto.current_round,
            amount_of_rounds: dto.amount_of_rounds,
            min_players: dto.min_amount_of_players,
            max_players: dto.max_amount_of_players,
            players: dto.players.into_iter().map(Player::from).collect(),
        }
    }
}

impl From<PlayerDto> for Player {
    fn from(dto: PlayerDto) -> Self {
        Player {
            id: dto.id,
            full_name: dto.full_name,
            rating: dto.rating,
            score: dto.score,
        }
    }
}

impl From<MatchDto> for Match {
    fn from(dto: MatchDto) -> Self {
        Match {
            id: dto.id,
            round_number: dto.round_number,
            white_player: dto.white_player_name,
            black_player: dto.black_player_name,
            persisted_result: dto.result,
        }
    }
}

/// [`TournamentService`] over HTTP. Cheap to clone; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct HttpTournamentService {
    client: Client,
    base_url: String,
}

impl HttpTournamentService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn authorized(request: RequestBuilder, session: &Session) -> RequestBuilder {
    match session.bearer_token() {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

/// Send the request and turn transport failures and non-success statuses into errors.
async fn send(request: RequestBuilder) -> Result<Response, ServiceError> {
    let response = request
        .send()
        .await
        .map_err(|e| ServiceError::Transport(e.to_string()))?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(ServiceError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ServiceError> {
    send(request)
        .await?
        .json::<T>()
        .await
        .map_err(|e| ServiceError::Decode(e.to_string()))
}

impl TournamentService for HttpTournamentService {
    async fn fetch_tournament(&self, id: TournamentId) -> Result<Tournament, ServiceError> {
        let dto: TournamentDto =
            send_json(self.client.get(self.url(&format!("/api/tournament/{id}")))).await?;
        Ok(dto.into())
    }

    async fn fetch_matches(
        &self,
        id: TournamentId,
        round: u32,
    ) -> Result<Vec<Match>, ServiceError> {
        let request = self
            .client
            .get(self.url(&format!("/api/match/byTournament/{id}/{round}")))
            .query(&[("size", MATCH_PAGE_SIZE)]);
        let dtos: Vec<MatchDto> = send_json(request).await?;
        Ok(dtos.into_iter().map(Match::from).collect())
    }

    /// The service only accepts one result per request, so the batch is sent in order and
    /// stops at the first rejection. Results sent before the failure stay written; resending
    /// the whole batch overwrites them with the same values.
    async fn set_results(
        &self,
        session: &Session,
        edits: &[StagedEdit],
    ) -> Result<(), ServiceError> {
        for (sent, edit) in edits.iter().enumerate() {
            let request = self
                .client
                .patch(self.url(&set_result_path(edit.match_id)))
                .json(&SetResultRequest {
                    result: edit.result,
                });
            if let Err(e) = send(authorized(request, session)).await {
                log::warn!(
                    "Result for match {} rejected after {} of {} were written: {}",
                    edit.match_id,
                    sent,
                    edits.len(),
                    e
                );
                return Err(e);
            }
        }
        Ok(())
    }

    async fn create_next_round(
        &self,
        session: &Session,
        id: TournamentId,
    ) -> Result<u32, ServiceError> {
        let request = self
            .client
            .post(self.url(&format!("/api/admin/tournament/{id}/round")));
        send_json(authorized(request, session)).await
    }

    async fn rollback_round(
        &self,
        session: &Session,
        id: TournamentId,
    ) -> Result<(), ServiceError> {
        let request = self
            .client
            .patch(self.url(&format!("/api/admin/tournament/{id}/rollback")));
        send(authorized(request, session)).await?;
        Ok(())
    }

    async fn register(&self, session: &Session, id: TournamentId) -> Result<(), ServiceError> {
        let request = self
            .client
            .put(self.url(&format!("/api/tournament/{id}/registration")));
        send(authorized(request, session)).await?;
        Ok(())
    }

    async fn is_registered(
        &self,
        session: &Session,
        id: TournamentId,
    ) -> Result<bool, ServiceError> {
        let request = self
            .client
            .get(self.url(&format!("/api/tournament/{id}/if_registered")));
        send_json(authorized(request, session)).await
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthGrant, ServiceError> {
        send_json(
            self.client
                .post(self.url("/api/auth/login"))
                .json(credentials),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tournament_dto_maps_capacity_and_stage() {
        let json = r#"{
            "id": 7,
            "name": "Autumn Open",
            "stage": "PLAYING",
            "currentRound": 2,
            "amountOfRounds": 5,
            "minAmountOfPlayers": 4,
            "maxAmountOfPlayers": null,
            "players": [{ "id": 1, "fullName": "Anna K", "rating": 1500.0, "score": 1.5 }]
        }"#;
        let t: Tournament = serde_json::from_str::<TournamentDto>(json).unwrap().into();
        assert_eq!(t.stage, Stage::Playing);
        assert_eq!(t.current_round, 2);
        assert_eq!(t.min_players, Some(4));
        assert_eq!(t.max_players, None);
        assert_eq!(t.players[0].full_name, "Anna K");
    }

    #[test]
    fn match_dto_reads_numeric_results() {
        let json = r#"[
            { "id": 1, "roundNumber": 3, "whitePlayerName": "A", "blackPlayerName": "B", "result": 0.5 },
            { "id": 2, "roundNumber": 3, "whitePlayerName": "C", "blackPlayerName": "D", "result": null }
        ]"#;
        let matches: Vec<Match> = serde_json::from_str::<Vec<MatchDto>>(json)
            .unwrap()
            .into_iter()
            .map(Match::from)
            .collect();
        assert_eq!(matches[0].persisted_result, Some(Outcome::Draw));
        assert_eq!(matches[1].persisted_result, None);
    }

    #[test]
    fn match_dto_rejects_unknown_result() {
        let json = r#"{ "id": 1, "roundNumber": 1, "whitePlayerName": "A", "blackPlayerName": "B", "result": 0.25 }"#;
        assert!(serde_json::from_str::<MatchDto>(json).is_err());
    }

    #[test]
    fn results_are_sent_one_match_at_a_time() {
        let service = HttpTournamentService::with_client(Client::new(), "http://api.local");
        assert_eq!(
            service.url(&set_result_path(4)),
            "http://api.local/api/admin/match/4/setResult"
        );
        let decided = serde_json::to_value(SetResultRequest {
            result: Some(Outcome::Draw),
        })
        .unwrap();
        assert_eq!(decided, serde_json::json!({ "result": 0.5 }));
        let reset = serde_json::to_value(SetResultRequest { result: None }).unwrap();
        assert_eq!(reset, serde_json::json!({ "result": null }));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let service = HttpTournamentService::with_client(Client::new(), "http://api.local/");
        assert_eq!(service.url("/api/tournament/1"), "http://api.local/api/tournament/1");
    }
}
