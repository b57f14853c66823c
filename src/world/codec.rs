//! Chunk file format.
//!
//! A chunk file is a sequence of sections, each a little-endian `u32` byte
//! count followed by an lz4 block with its uncompressed size prepended:
//!
//! 1. metadata: JSON `{"g"|"f"|"s": {namespace: {name: relative id}}}`
//! 2. ground, 3. floor, 4. wall: 256 bytes each, row-major, `0xFF` = EMPTY
//! 5. entities: JSON array of `{"type": "ns:name", "data": ...}`
//!
//! Relative ids are assigned per layer per file in first-seen order, so files
//! stay valid when registration order changes between sessions. Trailing
//! sections after the entities are ignored.

use std::collections::{BTreeMap, HashMap};

use crate::entity::{Entity, EntityRecord};
use crate::error::CodecError;
use crate::registry::{Registries, ResourceHandle};
use crate::tile::{Layer, EMPTY};
use crate::world::chunk::CHUNK_AREA;

/// Byte marking an empty cell
pub const EMPTY_BYTE: u8 = 0xFF;

/// Distinct tiles one layer of one chunk file can name
pub const MAX_TILES_PER_LAYER: usize = EMPTY_BYTE as usize;

/// Largest uncompressed JSON section a chunk file may declare
pub const MAX_JSON_SECTION: usize = 4 << 20;

/// namespace -> name -> relative id
type LayerMetadata = BTreeMap<String, BTreeMap<String, u8>>;

/// Decoded chunk contents
#[derive(Debug)]
pub struct DecodedChunk {
    /// Logical session ids per layer, row-major
    pub layers: [[i32; CHUNK_AREA]; 3],
    pub entities: Vec<Box<dyn Entity>>,
}

/// Encode the logical tile ids and persisting entities of one chunk
pub fn encode(
    registries: &Registries,
    layers: &[[i32; CHUNK_AREA]; 3],
    entities: &[EntityRecord],
) -> Result<Vec<u8>, CodecError> {
    let mut metadata: BTreeMap<&'static str, LayerMetadata> = BTreeMap::new();
    let mut layer_bytes = Vec::with_capacity(Layer::ALL.len());

    for layer in Layer::ALL {
        let mut relative: HashMap<i32, u8> = HashMap::new();
        let names = metadata.entry(layer.save_key()).or_default();
        let mut bytes = vec![EMPTY_BYTE; CHUNK_AREA];

        for (cell, id) in bytes.iter_mut().zip(layers[layer.index()]) {
            let Some(def) = registries.tile(layer, id) else {
                // Sentinels and stale ids are stored as empty cells
                continue;
            };
            let next = relative.len();
            let rel = match relative.get(&id) {
                Some(rel) => *rel,
                None => {
                    if next >= MAX_TILES_PER_LAYER {
                        return Err(CodecError::TooManyTiles {
                            layer: layer.name(),
                            max: MAX_TILES_PER_LAYER,
                        });
                    }
                    let rel = next as u8;
                    relative.insert(id, rel);
                    names
                        .entry(def.handle.namespace.clone())
                        .or_default()
                        .insert(def.handle.name.clone(), rel);
                    rel
                }
            };
            *cell = rel;
        }
        layer_bytes.push(bytes);
    }

    let mut out = Vec::new();
    let metadata_json = serde_json::to_vec(&metadata).map_err(|source| CodecError::Json {
        section: "metadata",
        source,
    })?;
    write_section(&mut out, &metadata_json);
    for bytes in &layer_bytes {
        write_section(&mut out, bytes);
    }
    let entities_json = serde_json::to_vec(entities).map_err(|source| CodecError::Json {
        section: "entities",
        source,
    })?;
    write_section(&mut out, &entities_json);

    Ok(out)
}

/// Decode a chunk file against the live registries.
///
/// Unknown tile handles become EMPTY cells and malformed entity records are
/// skipped, both with a warning. Structural damage is an error.
pub fn decode(registries: &Registries, bytes: &[u8]) -> Result<DecodedChunk, CodecError> {
    let mut reader = SectionReader { bytes };

    let metadata_bytes = reader.next("metadata", MAX_JSON_SECTION)?;
    let metadata: BTreeMap<String, LayerMetadata> = serde_json::from_slice(&metadata_bytes)
        .map_err(|source| CodecError::Json {
            section: "metadata",
            source,
        })?;

    let mut layers = [[EMPTY; CHUNK_AREA]; 3];
    for layer in Layer::ALL {
        let remap = relative_to_session(registries, layer, metadata.get(layer.save_key()));
        let section = reader.next(layer.name(), CHUNK_AREA)?;
        if section.len() != CHUNK_AREA {
            return Err(CodecError::LayerSize {
                section: layer.name(),
                len: section.len(),
                expected: CHUNK_AREA,
            });
        }
        for (cell, byte) in layers[layer.index()].iter_mut().zip(section) {
            *cell = match byte {
                EMPTY_BYTE => EMPTY,
                rel => remap[rel as usize],
            };
        }
    }

    let entities_bytes = reader.next("entities", MAX_JSON_SECTION)?;
    let records: Vec<serde_json::Value> =
        serde_json::from_slice(&entities_bytes).map_err(|source| CodecError::Json {
            section: "entities",
            source,
        })?;
    let entities = records
        .into_iter()
        .filter_map(|value| decode_entity(registries, value))
        .collect();

    Ok(DecodedChunk { layers, entities })
}

/// Session id for every relative id of one layer (EMPTY when unresolved)
fn relative_to_session(
    registries: &Registries,
    layer: Layer,
    names: Option<&LayerMetadata>,
) -> [i32; MAX_TILES_PER_LAYER] {
    let mut remap = [EMPTY; MAX_TILES_PER_LAYER];
    for (namespace, tiles) in names.into_iter().flatten() {
        for (name, rel) in tiles {
            let handle = ResourceHandle::new(namespace.as_str(), name.as_str());
            match registries.tile_id(layer, &handle) {
                Ok(id) if (*rel as usize) < MAX_TILES_PER_LAYER => remap[*rel as usize] = id,
                Ok(_) => log::warn!("[LOAD] Relative id {} for {} out of range", rel, handle),
                Err(e) => log::warn!("[LOAD] Unknown {} tile {}: {}", layer.name(), handle, e),
            }
        }
    }
    remap
}

fn decode_entity(registries: &Registries, value: serde_json::Value) -> Option<Box<dyn Entity>> {
    let record: EntityRecord = match serde_json::from_value(value) {
        Ok(record) => record,
        Err(e) => {
            log::warn!("[LOAD] Skipping malformed entity record: {}", e);
            return None;
        }
    };
    let kind = match registries.entity_type(&record.type_tag) {
        Ok(kind) => kind,
        Err(e) => {
            log::warn!("[LOAD] Skipping entity of type {}: {}", record.type_tag, e);
            return None;
        }
    };
    match kind.create(record.data) {
        Ok(entity) => Some(entity),
        Err(e) => {
            log::warn!("[LOAD] Skipping corrupt {} entity: {}", record.type_tag, e);
            None
        }
    }
}

fn write_section(out: &mut Vec<u8>, raw: &[u8]) {
    let compressed = lz4_flex::compress_prepend_size(raw);
    // Sections are at most a few KiB
    out.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
    out.extend_from_slice(&compressed);
}

struct SectionReader<'a> {
    bytes: &'a [u8],
}

impl SectionReader<'_> {
    /// Next section, refusing blocks that claim more than `max` bytes
    fn next(&mut self, section: &'static str, max: usize) -> Result<Vec<u8>, CodecError> {
        let Some((len, rest)) = self.bytes.split_first_chunk::<4>() else {
            return Err(CodecError::Truncated { section });
        };
        let len = u32::from_le_bytes(*len) as usize;
        if rest.len() < len {
            return Err(CodecError::Truncated { section });
        }
        let (block, rest) = rest.split_at(len);
        self.bytes = rest;

        let Some((size, _)) = block.split_first_chunk::<4>() else {
            return Err(CodecError::Truncated { section });
        };
        let size = u32::from_le_bytes(*size) as usize;
        if size > max {
            return Err(CodecError::SectionTooLarge { section, size, max });
        }
        lz4_flex::decompress_size_prepended(block)
            .map_err(|source| CodecError::Decompress { section, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::base_registries;
    use crate::entity::{ItemDrop, PropKind, ResourceProp};
    use crate::item::ItemStack;
    use glam::Vec2;

    fn id(registries: &Registries, layer: Layer, name: &str) -> i32 {
        registries.tile_id(layer, &ResourceHandle::base(name)).unwrap()
    }

    fn sample_layers(registries: &Registries) -> [[i32; CHUNK_AREA]; 3] {
        let mut layers = [[EMPTY; CHUNK_AREA]; 3];
        let grass = id(registries, Layer::Ground, "grass");
        let sand = id(registries, Layer::Ground, "sand");
        for (i, cell) in layers[0].iter_mut().enumerate() {
            *cell = if i % 3 == 0 { sand } else { grass };
        }
        layers[1][17] = id(registries, Layer::Floor, "wood_floor");
        layers[2][200] = id(registries, Layer::Wall, "granite_wall");
        layers
    }

    #[test]
    fn test_layers_round_trip() -> anyhow::Result<()> {
        let registries = base_registries()?;
        let layers = sample_layers(&registries);

        let bytes = encode(&registries, &layers, &[])?;
        let decoded = decode(&registries, &bytes)?;

        assert_eq!(decoded.layers, layers);
        assert!(decoded.entities.is_empty());
        Ok(())
    }

    #[test]
    fn test_relative_ids_first_seen() -> anyhow::Result<()> {
        let registries = base_registries()?;
        let layers = sample_layers(&registries);
        let bytes = encode(&registries, &layers, &[])?;

        let mut reader = SectionReader { bytes: &bytes };
        let metadata: serde_json::Value = serde_json::from_slice(&reader.next("metadata", MAX_JSON_SECTION)?)?;
        // Cell 0 is sand, cell 1 grass
        assert_eq!(metadata["g"]["base"]["sand"], 0);
        assert_eq!(metadata["g"]["base"]["grass"], 1);
        assert_eq!(metadata["s"]["base"]["granite_wall"], 0);

        let ground = reader.next("ground", CHUNK_AREA)?;
        assert_eq!(&ground[..3], &[0, 1, 1]);
        let floor = reader.next("floor", CHUNK_AREA)?;
        assert_eq!(floor[17], 0);
        assert_eq!(floor[16], EMPTY_BYTE);
        Ok(())
    }

    #[test]
    fn test_unknown_handle_becomes_empty() -> anyhow::Result<()> {
        let registries = base_registries()?;
        let mut metadata = BTreeMap::new();
        metadata.insert(
            "g",
            BTreeMap::from([(
                "mod".to_string(),
                BTreeMap::from([("lava".to_string(), 0u8)]),
            )]),
        );

        let mut bytes = Vec::new();
        write_section(&mut bytes, &serde_json::to_vec(&metadata)?);
        let mut ground = vec![EMPTY_BYTE; CHUNK_AREA];
        ground[5] = 0;
        write_section(&mut bytes, &ground);
        write_section(&mut bytes, &[EMPTY_BYTE; CHUNK_AREA]);
        write_section(&mut bytes, &[EMPTY_BYTE; CHUNK_AREA]);
        write_section(&mut bytes, b"[]");

        let decoded = decode(&registries, &bytes)?;
        assert_eq!(decoded.layers[0][5], EMPTY);
        Ok(())
    }

    #[test]
    fn test_entities_round_trip_and_skip_corrupt() -> anyhow::Result<()> {
        let registries = base_registries()?;
        let prop = ResourceProp::new(Vec2::new(3.5, 4.5), PropKind::RockPile);
        let drop = ItemDrop::new(Vec2::new(1.0, 2.0), ItemStack::new(ResourceHandle::base("flint"), 3));

        let records = vec![
            EntityRecord::from_entity(&prop)?,
            EntityRecord {
                type_tag: "base:tree".into(),
                data: serde_json::json!({"position": "not a vector"}),
            },
            EntityRecord {
                type_tag: "mod:dragon".into(),
                data: serde_json::json!({}),
            },
            EntityRecord::from_entity(&drop)?,
        ];
        let bytes = encode(&registries, &[[EMPTY; CHUNK_AREA]; 3], &records)?;
        let decoded = decode(&registries, &bytes)?;

        assert_eq!(decoded.entities.len(), 2);
        assert_eq!(decoded.entities[0].id(), prop.id);
        assert_eq!(decoded.entities[0].to_json()?, serde_json::to_value(&prop)?);
        let rebuilt = decoded.entities[1]
            .as_any()
            .downcast_ref::<ItemDrop>()
            .expect("item drop");
        assert_eq!(rebuilt, &drop);
        Ok(())
    }

    #[test]
    fn test_out_of_range_entity_id_is_skipped() -> anyhow::Result<()> {
        let registries = base_registries()?;
        let prop = ResourceProp::new(Vec2::new(6.5, 6.5), PropKind::Branch);
        let records = vec![
            EntityRecord {
                type_tag: "base:tree".into(),
                data: serde_json::json!({"id": u64::MAX, "position": [1.5, 1.5]}),
            },
            EntityRecord::from_entity(&prop)?,
        ];
        let bytes = encode(&registries, &[[EMPTY; CHUNK_AREA]; 3], &records)?;
        let decoded = decode(&registries, &bytes)?;

        assert_eq!(decoded.entities.len(), 1);
        assert_eq!(decoded.entities[0].id(), prop.id);
        Ok(())
    }

    #[test]
    fn test_oversized_section_is_rejected() -> anyhow::Result<()> {
        let registries = base_registries()?;
        let bytes = encode(&registries, &sample_layers(&registries), &[])?;

        // Claim 4 GiB of ground data in the second section's size prefix
        let metadata_len = u32::from_le_bytes(bytes[..4].try_into()?) as usize;
        let ground = 4 + metadata_len;
        let mut forged = bytes.clone();
        forged[ground + 4..ground + 8].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            decode(&registries, &forged).unwrap_err(),
            CodecError::SectionTooLarge { section: "ground", max: CHUNK_AREA, .. }
        ));

        let mut forged = bytes;
        forged[4..8].copy_from_slice(&(MAX_JSON_SECTION as u32 + 1).to_le_bytes());
        assert!(matches!(
            decode(&registries, &forged).unwrap_err(),
            CodecError::SectionTooLarge { section: "metadata", .. }
        ));
        Ok(())
    }

    #[test]
    fn test_truncated_file() -> anyhow::Result<()> {
        let registries = base_registries()?;
        let bytes = encode(&registries, &sample_layers(&registries), &[])?;

        let err = decode(&registries, &bytes[..bytes.len() - 3]).unwrap_err();
        assert!(matches!(err, CodecError::Truncated { section: "entities" }));
        assert!(matches!(
            decode(&registries, &[1, 0]).unwrap_err(),
            CodecError::Truncated { section: "metadata" }
        ));
        Ok(())
    }

    #[test]
    fn test_wrong_layer_size() -> anyhow::Result<()> {
        let registries = base_registries()?;
        let mut bytes = Vec::new();
        write_section(&mut bytes, b"{}");
        write_section(&mut bytes, &[EMPTY_BYTE; 10]);

        assert!(matches!(
            decode(&registries, &bytes).unwrap_err(),
            CodecError::LayerSize { len: 10, .. }
        ));
        Ok(())
    }

    #[test]
    fn test_too_many_tiles() {
        let mut registries = Registries::new();
        for i in 0..300 {
            registries
                .register_tile(crate::tile::TileDef::new(
                    ResourceHandle::new("mod", format!("tile_{i}")),
                    Layer::Ground,
                    crate::tile::TileRef::new(
                        crate::tile::AtlasRegion::new(0, 0, 32, 32),
                        crate::tile::AutotileStrategy::None,
                    ),
                ))
                .unwrap();
        }
        registries.complete_registration().unwrap();

        let mut layers = [[EMPTY; CHUNK_AREA]; 3];
        for (i, cell) in layers[0].iter_mut().enumerate() {
            *cell = i as i32;
        }
        assert!(matches!(
            encode(&registries, &layers, &[]),
            Err(CodecError::TooManyTiles { layer: "ground", .. })
        ));
    }
}
