//! Serialized forms of packing results: the JSON document and the visualiser link.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;

use crate::config::ExportConfig;
use crate::error::Result;
use crate::model::{Container, Item};
use crate::packed::{PackedBox, PackedItem};
use crate::packed_list::PackedBoxList;
use crate::types::Dimensional;

/// Characters left as-is in the visualiser query string.
const QUERY_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContainerView<'a> {
    reference: &'a str,
    inner_width: u32,
    inner_length: u32,
    inner_depth: u32,
    empty_weight: u32,
    max_weight: u32,
}

impl<'a> From<&'a Container> for ContainerView<'a> {
    fn from(container: &'a Container) -> Self {
        Self {
            reference: &container.reference,
            inner_width: container.inner.width,
            inner_length: container.inner.length,
            inner_depth: container.inner.depth,
            empty_weight: container.empty_weight,
            max_weight: container.max_weight,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemView<'a> {
    description: &'a str,
    width: u32,
    length: u32,
    depth: u32,
    allowed_rotation: u8,
    weight: u32,
}

impl<'a> From<&'a Item> for ItemView<'a> {
    fn from(item: &'a Item) -> Self {
        Self {
            description: &item.description,
            width: item.dims.width,
            length: item.dims.length,
            depth: item.dims.depth,
            allowed_rotation: item.allowed_rotation.code(),
            weight: item.weight,
        }
    }
}

#[derive(Serialize)]
struct PackedItemView<'a> {
    x: u32,
    y: u32,
    z: u32,
    width: u32,
    length: u32,
    depth: u32,
    item: ItemView<'a>,
}

impl<'a> From<&'a PackedItem> for PackedItemView<'a> {
    fn from(packed: &'a PackedItem) -> Self {
        let (x, y, z) = packed.position();
        let dims = packed.dimensions();
        Self {
            x,
            y,
            z,
            width: dims.width,
            length: dims.length,
            depth: dims.depth,
            item: ItemView::from(packed.item().as_ref()),
        }
    }
}

#[derive(Serialize)]
struct PackedBoxView<'a> {
    #[serde(rename = "box")]
    container: ContainerView<'a>,
    items: Vec<PackedItemView<'a>>,
}

impl Serialize for PackedBox {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        PackedBoxView {
            container: self.container().into(),
            items: self.items().iter().map(PackedItemView::from).collect(),
        }
        .serialize(serializer)
    }
}

impl Serialize for PackedBoxList {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for packed_box in self {
            seq.serialize_element(packed_box)?;
        }
        seq.end()
    }
}

/// `[description, width, length, depth]`
type VisualisedItem<'a> = (&'a str, u32, u32, u32);
/// `[item index, x, y, z, width, length, depth]`
type VisualisedPlacement = (usize, u32, u32, u32, u32, u32, u32);
/// `[reference, inner width, inner length, inner depth, placements]`
type VisualisedBox<'a> = (&'a str, u32, u32, u32, Vec<VisualisedPlacement>);

#[derive(Serialize)]
struct VisualisationPayload<'a> {
    items: Vec<VisualisedItem<'a>>,
    boxes: Vec<VisualisedBox<'a>>,
}

impl<'a> VisualisationPayload<'a> {
    fn from_list(list: &'a PackedBoxList) -> Self {
        let mut items: Vec<VisualisedItem<'a>> = Vec::new();
        let boxes = list
            .iter()
            .map(|packed_box| {
                let placements = packed_box
                    .items()
                    .iter()
                    .map(|packed| {
                        let item = packed.item();
                        let entry = (
                            item.description.as_str(),
                            item.dims.width,
                            item.dims.length,
                            item.dims.depth,
                        );
                        let idx = match items.iter().position(|known| *known == entry) {
                            Some(idx) => idx,
                            None => {
                                items.push(entry);
                                items.len() - 1
                            }
                        };
                        let (x, y, z) = packed.position();
                        let dims = packed.dimensions();
                        (idx, x, y, z, dims.width, dims.length, dims.depth)
                    })
                    .collect();

                let container = packed_box.container();
                (
                    container.reference.as_str(),
                    container.inner.width,
                    container.inner.length,
                    container.inner.depth,
                    placements,
                )
            })
            .collect();

        Self { items, boxes }
    }
}

impl PackedBoxList {
    /// Compact JSON document of all boxes and their items.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Link to the default online visualiser showing this packing.
    pub fn generate_visualisation_url(&self) -> Result<String> {
        self.visualisation_url(&ExportConfig::default())
    }

    /// Link to the visualiser configured in `config`.
    pub fn visualisation_url(&self, config: &ExportConfig) -> Result<String> {
        let payload = serde_json::to_string(&VisualisationPayload::from_list(self))?;
        Ok(format!(
            "{}{}",
            config.visualiser_url(),
            utf8_percent_encode(&payload, QUERY_SAFE)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::types::{Dimensions, Rotation};

    fn single_item_list() -> PackedBoxList {
        let container = Container::new(
            "Box",
            Dimensions::new(10, 10, 20),
            10,
            Dimensions::new(10, 10, 20),
            10,
        )
        .unwrap();
        let item = Item::new("Item", Dimensions::new(4, 10, 10), 10, Rotation::KeepFlat).unwrap();
        let item = Arc::new(item);
        let packed = PackedItem::new(item, (0, 0, 0), Dimensions::new(4, 10, 10)).unwrap();

        let mut list = PackedBoxList::new();
        list.insert(PackedBox::new(container, std::iter::once(packed).collect()).unwrap());
        list
    }

    #[test]
    fn json_serialization() {
        assert_eq!(
            single_item_list().to_json().unwrap(),
            r#"[{"box":{"reference":"Box","innerWidth":10,"innerLength":10,"innerDepth":20,"emptyWeight":10,"maxWeight":10},"items":[{"x":0,"y":0,"z":0,"width":4,"length":10,"depth":10,"item":{"description":"Item","width":4,"length":10,"depth":10,"allowedRotation":2,"weight":10}}]}]"#
        );
    }

    #[test]
    fn empty_list_serializes_to_empty_array() {
        assert_eq!(PackedBoxList::new().to_json().unwrap(), "[]");
    }

    #[test]
    fn visualisation_url() {
        assert_eq!(
            single_item_list().generate_visualisation_url().unwrap(),
            "https://boxpacker.io/en/master/visualiser.html?packing=%7B%22items%22%3A%5B%5B%22Item%22%2C4%2C10%2C10%5D%5D%2C%22boxes%22%3A%5B%5B%22Box%22%2C10%2C10%2C20%2C%5B%5B0%2C0%2C0%2C0%2C4%2C10%2C10%5D%5D%5D%5D%7D"
        );
    }

    #[test]
    fn visualisation_deduplicates_items() {
        let container = Container::new(
            "Box",
            Dimensions::new(20, 10, 10),
            0,
            Dimensions::new(20, 10, 10),
            100,
        )
        .unwrap();
        let cube = || {
            Arc::new(Item::new("Cube", Dimensions::new(5, 5, 5), 1, Rotation::BestFit).unwrap())
        };
        let plank =
            Arc::new(Item::new("Plank", Dimensions::new(10, 5, 5), 1, Rotation::BestFit).unwrap());
        let items = vec![
            PackedItem::new(cube(), (0, 0, 0), Dimensions::new(5, 5, 5)).unwrap(),
            PackedItem::new(plank, (5, 0, 0), Dimensions::new(5, 10, 5)).unwrap(),
            PackedItem::new(cube(), (10, 0, 0), Dimensions::new(5, 5, 5)).unwrap(),
        ];
        let mut list = PackedBoxList::new();
        list.insert(PackedBox::new(container, items.into_iter().collect()).unwrap());

        let payload = serde_json::to_string(&VisualisationPayload::from_list(&list)).unwrap();
        assert_eq!(
            payload,
            r#"{"items":[["Cube",5,5,5],["Plank",10,5,5]],"boxes":[["Box",20,10,10,[[0,0,0,0,5,5,5],[1,5,0,0,5,10,5],[0,10,0,0,5,5,5]]]]}"#
        );
    }

    #[test]
    fn custom_visualiser_base() {
        let config = ExportConfig::new("https://example.test/view?p=");
        let url = single_item_list().visualisation_url(&config).unwrap();
        assert!(url.starts_with("https://example.test/view?p=%7B%22items%22"));
    }
}
