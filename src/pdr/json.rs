//! PDR JSON directory ingestion (spec §6 "Configuration surface"): one file
//! per PDR-type category, each carrying an `effecterPDRs` and/or
//! `sensorPDRs` array. A malformed file is logged and skipped — ingestion
//! never fails the whole directory load (spec §7), the same per-file
//! degrade-and-continue discipline the teacher applies to per-URI
//! certificate loading in `security/config.rs`.

use std::fs;
use std::path::Path;

use log::warn;
use serde::Deserialize;

use crate::error::JsonIngestError;
use crate::pdr::record::{PdrRecord, PdrType};
use crate::pdr::repository::PdrRepository;
use crate::pdr::types::{EntityAssociationPdr, StateEffecterPdr, StateSensorPdr};

#[derive(Debug, Default, Deserialize)]
struct PdrFileSchema {
    #[serde(default, rename = "effecterPDRs")]
    effecter_pdrs: Vec<RawPdr>,
    #[serde(default, rename = "sensorPDRs")]
    sensor_pdrs: Vec<RawPdr>,
    #[serde(default, rename = "entityAssociationPDRs")]
    entity_association_pdrs: Vec<RawPdr>,
}

#[derive(Debug, Deserialize)]
struct RawPdr {
    #[serde(rename = "pdrType")]
    pdr_type: u8,
    #[serde(default)]
    terminus_handle: u16,
    #[serde(default)]
    sensor_id: u16,
    #[serde(default)]
    effecter_id: u16,
    #[serde(default)]
    entity_type: u16,
    #[serde(default)]
    entity_instance: u16,
    #[serde(default)]
    container_id: u16,
    #[serde(default, rename = "possibleStates")]
    possible_states: Vec<Vec<u8>>,
    #[serde(default, rename = "containedEntities")]
    contained_entities: Vec<u16>,
}

impl RawPdr {
    fn into_record(self) -> Result<PdrRecord, JsonIngestError> {
        let pdr_type = PdrType::from_wire_code(self.pdr_type);
        let payload = match pdr_type {
            PdrType::StateSensor => StateSensorPdr {
                terminus_handle: self.terminus_handle,
                sensor_id: self.sensor_id,
                container_id: self.container_id,
                entity_type: self.entity_type,
                entity_instance: self.entity_instance,
                possible_states: self.possible_states,
            }
            .encode(),
            PdrType::StateEffecter => StateEffecterPdr {
                terminus_handle: self.terminus_handle,
                effecter_id: self.effecter_id,
                entity_type: self.entity_type,
                entity_instance: self.entity_instance,
                container_id: self.container_id,
            }
            .encode(),
            PdrType::EntityAssociation => EntityAssociationPdr {
                terminus_handle: self.terminus_handle,
                container_id: self.container_id,
                contained_entities: self.contained_entities,
            }
            .encode(),
            other => {
                return Err(JsonIngestError(format!(
                    "unsupported PDR type {other:?} in JSON descriptor"
                )))
            }
        };
        Ok(PdrRecord {
            handle: crate::eid::PdrHandle(0),
            next_handle: crate::eid::PdrHandle(0),
            pdr_type,
            version: 1,
            change_num: 0,
            payload,
        })
    }
}

/// Loads every `*.json` file directly under `dir` into `repo`. Per spec §7,
/// a file that fails to parse (bad JSON, unsupported `pdrType`) is logged
/// at `warn!` and skipped; the repository is populated from whatever did
/// parse.
pub fn load_directory(repo: &mut PdrRepository, dir: &Path) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("PDR JSON directory {} unreadable: {e}", dir.display());
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if let Err(e) = load_file(repo, &path) {
            warn!("skipping malformed PDR descriptor {}: {e}", path.display());
        }
    }
}

fn load_file(repo: &mut PdrRepository, path: &Path) -> Result<(), JsonIngestError> {
    let text = fs::read_to_string(path).map_err(|e| JsonIngestError(e.to_string()))?;
    let schema: PdrFileSchema =
        serde_json::from_str(&text).map_err(|e| JsonIngestError(e.to_string()))?;
    for raw in schema
        .effecter_pdrs
        .into_iter()
        .chain(schema.sensor_pdrs)
        .chain(schema.entity_association_pdrs)
    {
        repo.add(raw.into_record()?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn ingests_mixed_sensor_and_effecter_file() {
        let dir = std::env::temp_dir().join(format!(
            "pldm-platform-pdr-json-test-{:?}",
            std::thread::current().id()
        ));
        fs::create_dir_all(&dir).unwrap();
        let file_path = dir.join("host_pdrs.json");
        let mut file = fs::File::create(&file_path).unwrap();
        write!(
            file,
            r#"{{
                "sensorPDRs": [
                    {{ "pdrType": 4, "terminus_handle": 1, "sensor_id": 9,
                       "possibleStates": [[0,1,2]] }}
                ],
                "effecterPDRs": [
                    {{ "pdrType": 11, "terminus_handle": 1, "effecter_id": 3 }}
                ]
            }}"#
        )
        .unwrap();

        let mut repo = PdrRepository::new();
        load_directory(&mut repo, &dir);
        assert_eq!(repo.len(), 2);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn malformed_file_is_skipped_not_fatal() {
        let dir = std::env::temp_dir().join(format!(
            "pldm-platform-pdr-json-bad-{:?}",
            std::thread::current().id()
        ));
        fs::create_dir_all(&dir).unwrap();
        let file_path = dir.join("broken.json");
        fs::write(&file_path, "{ not json").unwrap();

        let mut repo = PdrRepository::new();
        load_directory(&mut repo, &dir);
        assert!(repo.empty());

        fs::remove_dir_all(&dir).ok();
    }
}
