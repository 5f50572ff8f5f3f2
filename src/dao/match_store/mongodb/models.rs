use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{MongoDaoError, MongoResult};
use crate::{
    dao::models::{MatchEntity, PlayerBoardEntity},
    state::match_machine::MatchStatus,
};

/// Shape of a match inside the `matches` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMatchDocument {
    #[serde(rename = "_id")]
    id: String,
    creator: PlayerBoardEntity,
    second: Option<PlayerBoardEntity>,
    status: MatchStatus,
    created_at: DateTime,
    started_at: Option<DateTime>,
    last_activity_at: Option<DateTime>,
    version: i64,
}

impl From<MatchEntity> for MongoMatchDocument {
    fn from(value: MatchEntity) -> Self {
        Self {
            id: value.id.to_string(),
            creator: value.creator,
            second: value.second,
            status: value.status,
            created_at: DateTime::from_system_time(value.created_at),
            started_at: value.started_at.map(DateTime::from_system_time),
            last_activity_at: value.last_activity_at.map(DateTime::from_system_time),
            version: value.version as i64,
        }
    }
}

impl MongoMatchDocument {
    pub fn into_entity(self) -> MongoResult<MatchEntity> {
        let id = Uuid::parse_str(&self.id).map_err(|source| MongoDaoError::MalformedDocument {
            raw_id: self.id.clone(),
            source,
        })?;

        Ok(MatchEntity {
            id,
            creator: self.creator,
            second: self.second,
            status: self.status,
            created_at: self.created_at.to_system_time(),
            started_at: self.started_at.map(|at| at.to_system_time()),
            last_activity_at: self.last_activity_at.map(|at| at.to_system_time()),
            version: self.version.max(0) as u64,
        })
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": id.to_string()}
}

/// Filter matching `id` only while it is still at `version`.
pub fn doc_id_at_version(id: Uuid, version: u64) -> Document {
    doc! {"_id": id.to_string(), "version": version as i64}
}

/// Filter for non-terminal matches involving `participant`.
pub fn active_for_participant(participant: i64) -> Document {
    let active: Vec<&str> = MatchStatus::ACTIVE.iter().map(|s| s.as_str()).collect();
    doc! {
        "$or": [
            {"creator.participant_id": participant},
            {"second.participant_id": participant},
        ],
        "status": {"$in": active},
    }
}
