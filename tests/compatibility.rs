//! Schema drift and malformed input.
//!
//! Writers and readers built against different versions of a record must
//! stay aligned on every sibling that follows the drifted one.

use lbinary::{BinaryReader, BinaryWriter, LBinaryCodec, Result, Serializable, StringEncoding};
use proptest::prelude::*;

#[derive(Debug, Clone, Default, PartialEq)]
struct ItemShort {
    name: Option<String>,
}

impl Serializable for ItemShort {
    fn serialize(&self, writer: &mut BinaryWriter) -> Result<()> {
        writer.write_string(self.name.as_deref())
    }

    fn deserialize(&mut self, reader: &mut BinaryReader<'_>) {
        self.name = reader.read_string();
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct ItemExtended {
    name: Option<String>,
    weight: f64,
    aliases: Option<Vec<String>>,
    inner: Option<Box<ItemExtended>>,
}

impl Serializable for ItemExtended {
    fn serialize(&self, writer: &mut BinaryWriter) -> Result<()> {
        writer.write_string(self.name.as_deref())?;
        writer.write_f64(self.weight)?;
        writer.write_strings(self.aliases.as_deref(), StringEncoding::Utf8)?;
        writer.write_object(self.inner.as_deref())
    }

    fn deserialize(&mut self, reader: &mut BinaryReader<'_>) {
        self.name = reader.read_string();
        self.weight = reader.read_f64();
        self.aliases = reader.read_strings(StringEncoding::Utf8);
        self.inner = reader.read_object::<ItemExtended>().map(Box::new);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Container<T> {
    items: Option<Vec<T>>,
    single: Option<T>,
    checksum: u32,
}

impl<T: Serializable + Default> Serializable for Container<T> {
    fn serialize(&self, writer: &mut BinaryWriter) -> Result<()> {
        writer.write_objects(self.items.as_deref())?;
        writer.write_object(self.single.as_ref())?;
        writer.write_u32(self.checksum)
    }

    fn deserialize(&mut self, reader: &mut BinaryReader<'_>) {
        self.items = reader.read_objects();
        self.single = reader.read_object();
        self.checksum = reader.read_u32();
    }
}

fn extended(name: &str, weight: f64) -> ItemExtended {
    ItemExtended {
        name: Some(name.to_string()),
        weight,
        aliases: Some(vec![format!("{name}-alias"), String::new()]),
        inner: Some(Box::new(ItemExtended {
            name: Some(format!("{name}-inner")),
            weight: weight * 2.0,
            aliases: None,
            inner: None,
        })),
    }
}

/// Older readers skip trailing fields without drifting.
#[test]
fn test_backward_compatibility() {
    let written = Container {
        items: Some(vec![extended("a", 1.0), extended("b", 2.0), extended("c", 3.0)]),
        single: Some(extended("s", 4.0)),
        checksum: 0xC0FF_EE00,
    };
    let bytes = LBinaryCodec::encode(&written).unwrap();

    let read: Container<ItemShort> = LBinaryCodec::decode(&bytes);
    let names: Vec<_> = read
        .items
        .unwrap()
        .into_iter()
        .map(|item| item.name.unwrap())
        .collect();
    assert_eq!(names, ["a", "b", "c"]);
    assert_eq!(read.single.unwrap().name.as_deref(), Some("s"));
    assert_eq!(read.checksum, 0xC0FF_EE00);
}

/// Newer readers get defaults for fields an older writer never wrote.
#[test]
fn test_forward_compatibility() {
    let written = Container {
        items: Some(vec![
            ItemShort { name: Some("x".into()) },
            ItemShort { name: None },
        ]),
        single: Some(ItemShort { name: Some("y".into()) }),
        checksum: 77,
    };
    let bytes = LBinaryCodec::encode(&written).unwrap();

    let read: Container<ItemExtended> = LBinaryCodec::decode(&bytes);
    let items = read.items.unwrap();
    assert_eq!(
        items,
        vec![
            ItemExtended {
                name: Some("x".into()),
                ..Default::default()
            },
            ItemExtended::default(),
        ]
    );
    assert_eq!(read.single.unwrap().name.as_deref(), Some("y"));
    assert_eq!(read.checksum, 77);
}

/// A buffer cut inside a fixed-width field yields defaults from there on.
#[test]
fn test_truncated_buffer() {
    let mut writer = BinaryWriter::new();
    writer.write_i32(5).unwrap();
    writer.write_i64(i64::MAX).unwrap();
    writer.write_i32(6).unwrap();
    let bytes = writer.to_bytes().unwrap();

    let mut reader = BinaryReader::new(&bytes[..8]);
    assert_eq!(reader.read_i32(), 5);
    assert_eq!(reader.read_i64(), 0);
    assert_eq!(reader.read_i32(), 0);
    assert_eq!(reader.read_string(), None);
}

/// Truncation inside a nested object never reaches its parent's siblings.
#[test]
fn test_truncated_nested_object() {
    let written = Container {
        items: Some(vec![extended("long name here", 1.0)]),
        single: None,
        checksum: 1,
    };
    let bytes = LBinaryCodec::encode(&written).unwrap();

    for cut in 0..bytes.len() {
        let read: Container<ItemExtended> = LBinaryCodec::decode(&bytes[..cut]);
        assert_eq!(read.checksum, 0, "checksum present with only {cut} bytes");
    }
    let read: Container<ItemExtended> = LBinaryCodec::decode(&bytes);
    assert_eq!(read, written);
}

fn arb_extended() -> impl Strategy<Value = ItemExtended> {
    let leaf = (
        proptest::option::of(".{0,12}"),
        -1e9f64..1e9,
        proptest::option::of(proptest::collection::vec(".{0,6}", 0..4)),
    )
        .prop_map(|(name, weight, aliases)| ItemExtended {
            name,
            weight,
            aliases,
            inner: None,
        });
    leaf.prop_recursive(3, 8, 1, |inner| {
        (
            proptest::option::of(".{0,12}"),
            -1e9f64..1e9,
            proptest::option::of(inner),
        )
            .prop_map(|(name, weight, inner)| ItemExtended {
                name,
                weight,
                aliases: None,
                inner: inner.map(Box::new),
            })
    })
}

proptest! {
    #[test]
    fn prop_round_trip(items in proptest::collection::vec(arb_extended(), 0..6), checksum: u32) {
        let written = Container { items: Some(items), single: None, checksum };
        let bytes = LBinaryCodec::encode(&written).unwrap();
        let read: Container<ItemExtended> = LBinaryCodec::decode(&bytes);
        prop_assert_eq!(read, written);
    }

    #[test]
    fn prop_short_reader_keeps_alignment(items in proptest::collection::vec(arb_extended(), 1..6), checksum: u32) {
        let written = Container { items: Some(items.clone()), single: items.first().cloned(), checksum };
        let bytes = LBinaryCodec::encode(&written).unwrap();

        let read: Container<ItemShort> = LBinaryCodec::decode(&bytes);
        let names: Vec<_> = read.items.unwrap().into_iter().map(|item| item.name).collect();
        let expected: Vec<_> = items.into_iter().map(|item| item.name).collect();
        prop_assert_eq!(names, expected);
        prop_assert_eq!(read.checksum, checksum);
    }

    #[test]
    fn prop_arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _: Container<ItemExtended> = LBinaryCodec::decode(&bytes);
        let mut reader = BinaryReader::new(&bytes);
        let _ = reader.read_string_string_map(StringEncoding::Utf16);
        let _ = reader.read_values::<u64>();
        prop_assert!(reader.position() <= bytes.len());
    }

    #[test]
    fn prop_growth_transparent(values in proptest::collection::vec(any::<i64>(), 0..200), capacity in 1usize..64) {
        let mut small = BinaryWriter::with_capacity(capacity);
        small.write_values(Some(&values[..])).unwrap();
        let mut large = BinaryWriter::with_capacity(4096);
        large.write_values(Some(&values[..])).unwrap();
        prop_assert_eq!(small.as_slice().unwrap(), large.as_slice().unwrap());
    }
}

proptest! {
    #[test]
    fn prop_string_encodings(text in "\\PC{0,40}") {
        for encoding in [StringEncoding::Utf8, StringEncoding::Utf16, StringEncoding::Utf32] {
            let mut writer = BinaryWriter::new();
            writer.write_string_encoded(Some(&text), encoding).unwrap();
            let bytes = writer.to_bytes().unwrap();
            let read = BinaryReader::new(&bytes).read_string_encoded(encoding);
            prop_assert_eq!(read.as_deref(), Some(text.as_str()));
        }
    }
}
