use dbpf::qfs::{self, CompressionOptions};
use dbpf::{types, Dbpf, DbpfError, Directory, EntryKey, Version};
use paste::paste;
use tempfile::tempdir;

const REPEATING: &[u8] = b"AAABBBCCCAAAAAABBBCCCDDDAAABBBABABAB";
const INCOMPRESSIBLE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*()";
const UI_GROUP: u32 = 0xA99D_8A11;

fn ui_script(lines: usize) -> Vec<u8> {
    (0..lines)
        .flat_map(|i| {
            format!("<LEGACY clsid=GZWinGen iid=IGZWinGen id=0x{i:08x} area=(0,0,800,600) >\r\n")
                .into_bytes()
        })
        .collect()
}

fn key(type_id: u32, instance_id: u32, resource_id: u32) -> EntryKey {
    EntryKey::new(type_id, UI_GROUP, instance_id, resource_id)
}

/// A package with two compressed, one plain and one incompressible entry
fn sample_package(index_version: Version) -> Dbpf {
    let has_resource_id = index_version >= Version::RESOURCE_ID;
    let resource = |id| if has_resource_id { id } else { 0 };

    let mut package = Dbpf::new();
    package.header_mut().index_version = index_version;
    package.add_entry(key(types::UI_DATA, 1, resource(11)), ui_script(40), true);
    package.add_entry(key(types::UI_DATA, 2, resource(12)), ui_script(3), false);
    package.add_entry(key(types::IMAGE, 3, resource(13)), REPEATING, true);
    package.add_entry(key(types::ACCEL_DEF, 4, resource(14)), INCOMPRESSIBLE, true);
    package
}

fn directory_entries(package: &Dbpf) -> usize {
    package
        .entries()
        .iter()
        .filter(|entry| entry.key.is_directory())
        .count()
}

fn test_round_trip(index_version: Version) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("round_trip.package");

    let mut package = sample_package(index_version);
    package.save(&path).unwrap();

    let mut reread = Dbpf::open(&path).unwrap();
    assert_eq!(reread.header().index_version, index_version);
    assert_eq!(reread.entries().len(), package.entries().len());

    for (original, copy) in package.entries_mut().iter_mut().zip(reread.entries_mut()) {
        assert_eq!(original.key, copy.key);
        assert_eq!(original.compress, copy.compress, "{}", original.key);
        assert_eq!(original.file_size, copy.file_size);
        assert_eq!(original.file_location, copy.file_location);
        if !original.key.is_directory() {
            assert_eq!(original.decompressed_size, copy.decompressed_size);
            assert_eq!(original.data().unwrap(), copy.data().unwrap());
        }
    }
}

fn test_resave_is_stable(index_version: Version) {
    let bytes = sample_package(index_version).to_bytes().unwrap();
    let mut reread = Dbpf::from_bytes(bytes.clone()).unwrap();
    assert_eq!(reread.to_bytes().unwrap(), bytes);
    assert!(reread.entries().iter().all(|entry| !entry.is_modified()));
}

fn test_directory_lists_compressed(index_version: Version) {
    let has_resource_id = index_version >= Version::RESOURCE_ID;
    let mut package = sample_package(index_version);
    let bytes = package.to_bytes().unwrap();
    assert_eq!(directory_entries(&package), 1);

    let mut reread = Dbpf::from_bytes(bytes).unwrap();
    let directory_bytes = reread
        .entries_mut()
        .iter_mut()
        .find(|entry| entry.key.is_directory())
        .unwrap()
        .raw()
        .unwrap()
        .to_vec();
    let directory = Directory::parse(&directory_bytes, has_resource_id);

    let compressed: Vec<EntryKey> = reread
        .entries()
        .iter()
        .filter(|entry| entry.compress)
        .map(|entry| entry.key)
        .collect();
    assert_eq!(compressed.len(), 2);
    assert_eq!(directory.len(), compressed.len());
    for key in &compressed {
        let record = directory.lookup(key).unwrap();
        assert_eq!(
            record.decompressed_size,
            reread.get_entry(key).unwrap().decompressed_size
        );
    }
}

fn test_record_width(index_version: Version) {
    let mut package = sample_package(index_version);
    package.to_bytes().unwrap();
    let width = if index_version >= Version::RESOURCE_ID { 24 } else { 20 };
    let header = package.header();
    assert_eq!(header.index_size, header.index_entry_count * width);
}

macro_rules! container_test {
    ($major:literal, $minor:literal) => {
        paste! {
            #[test]
            fn [<index_ $major _ $minor _round_trips>]() {
                test_round_trip(Version::new($major, $minor));
            }

            #[test]
            fn [<index_ $major _ $minor _resave_is_stable>]() {
                test_resave_is_stable(Version::new($major, $minor));
            }

            #[test]
            fn [<index_ $major _ $minor _directory_lists_compressed>]() {
                test_directory_lists_compressed(Version::new($major, $minor));
            }

            #[test]
            fn [<index_ $major _ $minor _record_width>]() {
                test_record_width(Version::new($major, $minor));
            }
        }
    };
}

container_test!(7, 0);
container_test!(7, 1);
container_test!(7, 2);

#[test]
fn resource_id_survives_7_2() {
    let mut package = sample_package(Version::new(7, 2));
    let mut reread = Dbpf::from_bytes(package.to_bytes().unwrap()).unwrap();
    let entry = reread.get_entry_mut(&key(types::IMAGE, 3, 13)).unwrap();
    assert!(entry.compress);
    assert_eq!(entry.data().unwrap(), REPEATING);
}

#[test]
fn no_directory_without_compressed_entries() {
    let mut package = Dbpf::new();
    package.add_entry(key(types::UI_DATA, 1, 0), ui_script(5), false);
    package.add_entry(key(types::ACCEL_DEF, 2, 0), INCOMPRESSIBLE, true);
    let bytes = package.to_bytes().unwrap();
    assert_eq!(directory_entries(&package), 0);

    let reread = Dbpf::from_bytes(bytes).unwrap();
    assert_eq!(reread.entries().len(), 2);
    assert_eq!(directory_entries(&reread), 0);
}

#[test]
fn directory_dropped_once_nothing_is_compressed() {
    let mut package = sample_package(Version::new(7, 1));
    let mut reread = Dbpf::from_bytes(package.to_bytes().unwrap()).unwrap();
    assert_eq!(directory_entries(&reread), 1);

    for entry in reread.entries_mut() {
        entry.compress = false;
    }
    let mut plain = Dbpf::from_bytes(reread.to_bytes().unwrap()).unwrap();
    assert_eq!(directory_entries(&plain), 0);
    let entry = plain.get_entry_mut(&key(types::UI_DATA, 1, 0)).unwrap();
    assert!(!entry.compress);
    assert_eq!(entry.data().unwrap(), ui_script(40));
}

#[test]
fn directory_keeps_its_identity() {
    let mut package = sample_package(Version::new(7, 1));
    package.to_bytes().unwrap();
    let directory_key = package
        .entries()
        .iter()
        .find(|entry| entry.key.is_directory())
        .unwrap()
        .key;
    assert_eq!(directory_key.type_id, types::DIRECTORY);

    let mut reread = Dbpf::from_bytes(package.to_bytes().unwrap()).unwrap();
    reread.to_bytes().unwrap();
    assert!(reread.get_entry(&directory_key).is_ok());
    assert_eq!(directory_entries(&reread), 1);
}

#[test]
fn incompressible_entry_saved_uncompressed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("incompressible.package");

    let mut package = Dbpf::new();
    let entry = package.add_entry(key(types::UI_DATA, 9, 0), INCOMPRESSIBLE, false);
    entry.compress = true;
    package.save(&path).unwrap();

    let entry = package.get_entry_mut(&key(types::UI_DATA, 9, 0)).unwrap();
    assert!(!entry.compress);
    assert_eq!(entry.data().unwrap(), INCOMPRESSIBLE);

    let mut reread = Dbpf::open(&path).unwrap();
    let entry = reread.get_entry_mut(&key(types::UI_DATA, 9, 0)).unwrap();
    assert!(!entry.compress);
    assert_eq!(entry.raw().unwrap(), INCOMPRESSIBLE);
}

#[test]
fn flag_set_after_load_compresses_on_save() {
    let mut package = Dbpf::new();
    package.add_entry(key(types::UI_DATA, 1, 0), ui_script(20), false);
    let mut reread = Dbpf::from_bytes(package.to_bytes().unwrap()).unwrap();

    reread.get_entry_mut(&key(types::UI_DATA, 1, 0)).unwrap().compress = true;
    let mut compressed = Dbpf::from_bytes(reread.to_bytes().unwrap()).unwrap();
    let entry = compressed.get_entry_mut(&key(types::UI_DATA, 1, 0)).unwrap();
    assert!(entry.compress);
    assert!((entry.file_size as usize) < ui_script(20).len());
    assert_eq!(entry.data().unwrap(), ui_script(20));
}

#[test]
fn modified_entry_is_repacked() {
    let mut package = sample_package(Version::new(7, 1));
    let mut reread = Dbpf::from_bytes(package.to_bytes().unwrap()).unwrap();

    let target = key(types::UI_DATA, 2, 0);
    let entry = reread.get_entry_mut(&target).unwrap();
    let mut script = entry.data().unwrap().to_vec();
    script.extend(ui_script(60));
    entry.compress = true;
    entry.set_data(script.clone());
    assert!(entry.is_modified());
    assert!(entry.compress);

    let untouched_size = reread
        .get_entry(&key(types::IMAGE, 3, 0))
        .unwrap()
        .file_size;

    let mut patched = Dbpf::from_bytes(reread.to_bytes().unwrap()).unwrap();
    let entry = patched.get_entry_mut(&target).unwrap();
    assert!(entry.compress);
    assert_eq!(entry.decompressed_size as usize, script.len());
    assert_eq!(entry.data().unwrap(), script);
    assert_eq!(
        patched.get_entry(&key(types::IMAGE, 3, 0)).unwrap().file_size,
        untouched_size
    );
}

#[test]
fn removed_entry_is_gone_after_save() {
    let mut package = sample_package(Version::new(7, 1));
    let removed = package.remove_entry(&key(types::IMAGE, 3, 0)).unwrap();
    assert_eq!(removed.key, key(types::IMAGE, 3, 0));

    let reread = Dbpf::from_bytes(package.to_bytes().unwrap()).unwrap();
    assert!(matches!(
        reread.get_entry(&key(types::IMAGE, 3, 0)),
        Err(DbpfError::EntryNotFound(_))
    ));
    // only the ui script is left compressed
    assert_eq!(
        reread.entries().iter().filter(|entry| entry.compress).count(),
        1
    );
}

#[test]
fn entry_from_file() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("layout.uiscript");
    std::fs::write(&source, ui_script(10)).unwrap();

    let mut package = Dbpf::new();
    let entry = package
        .add_entry_from_file(key(types::UI_DATA, 5, 0), &source, true)
        .unwrap();
    assert!(entry.compress);
    assert_eq!(entry.data().unwrap(), ui_script(10));

    assert!(matches!(
        package.add_entry_from_file(key(types::UI_DATA, 6, 0), dir.path().join("missing"), false),
        Err(DbpfError::Io(_))
    ));
}

#[test]
fn decoded_data_is_cached() {
    let mut package = sample_package(Version::new(7, 1));
    let mut reread = Dbpf::from_bytes(package.to_bytes().unwrap()).unwrap();
    let entry = reread.get_entry_mut(&key(types::UI_DATA, 1, 0)).unwrap();

    let first = entry.data().unwrap().as_ptr();
    let second = entry.data().unwrap().as_ptr();
    assert_eq!(first, second);

    entry.clear_cache();
    assert_eq!(entry.data().unwrap(), ui_script(40));
}

#[test]
fn corrupt_entry_surfaces_on_read() {
    let mut package = Dbpf::new();
    package.add_entry(key(types::UI_DATA, 1, 0), ui_script(20), true);
    let mut bytes = package.to_bytes().unwrap();
    let location = package.entries()[0].file_location as usize;
    // QFS magic of the first entry
    bytes[location + 5] = 0;

    let mut reread = Dbpf::from_bytes(bytes).unwrap();
    let entry = reread.get_entry_mut(&key(types::UI_DATA, 1, 0)).unwrap();
    assert!(matches!(
        entry.data(),
        Err(DbpfError::InvalidMagicHeader(_))
    ));
    let raw = entry.data_safe().unwrap().to_vec();
    assert_eq!(raw.len(), entry.file_size as usize);
    assert!(!entry.compress);
}

#[test]
fn failed_save_leaves_nothing_behind() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing_dir").join("out.package");
    let mut package = sample_package(Version::new(7, 1));
    assert!(matches!(package.save(&path), Err(DbpfError::Io(_))));
    assert!(!path.exists());
}

/// A package whose directory has a custom instance and whose first entry is
/// compressed with a broken QFS magic, flagged uncompressed so that writing
/// it has to decode it
fn package_with_broken_entry() -> Dbpf {
    let mut package = sample_package(Version::new(7, 1));
    package.to_bytes().unwrap();
    package
        .entries_mut()
        .iter_mut()
        .find(|entry| entry.key.is_directory())
        .unwrap()
        .key
        .instance_id = 0x1234;
    let mut bytes = package.to_bytes().unwrap();
    let location = package.entries()[0].file_location as usize;
    bytes[location + 5] = 0;

    let mut broken = Dbpf::from_bytes(bytes).unwrap();
    broken.entries_mut()[0].compress = false;
    broken
}

fn directory_instance(package: &Dbpf) -> Option<u32> {
    package
        .entries()
        .iter()
        .find(|entry| entry.key.is_directory())
        .map(|entry| entry.key.instance_id)
}

#[test]
fn failed_write_keeps_entries() {
    let mut package = package_with_broken_entry();
    let count = package.entries().len();
    assert_eq!(directory_instance(&package), Some(0x1234));

    assert!(matches!(
        package.to_bytes(),
        Err(DbpfError::InvalidMagicHeader(_))
    ));
    assert_eq!(package.entries().len(), count);
    assert_eq!(directory_instance(&package), Some(0x1234));

    // leave the broken entry as stored and the write goes through
    package.entries_mut()[0].compress = true;
    let reread = Dbpf::from_bytes(package.to_bytes().unwrap()).unwrap();
    assert_eq!(directory_instance(&reread), Some(0x1234));
}

#[test]
fn failed_save_keeps_existing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ui.package");
    std::fs::write(&path, b"previous contents").unwrap();

    let mut package = package_with_broken_entry();
    assert!(package.save(&path).is_err());
    assert_eq!(std::fs::read(&path).unwrap(), b"previous contents");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn save_replaces_existing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ui.package");
    std::fs::write(&path, vec![0xAA; 10_000]).unwrap();

    let mut package = sample_package(Version::new(7, 1));
    package.save(&path).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), package.to_bytes().unwrap());
    // no temporary files left next to the package
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn truncated_package_is_rejected() {
    let mut package = sample_package(Version::new(7, 1));
    let bytes = package.to_bytes().unwrap();
    let truncated = bytes[..bytes.len() - 4].to_vec();
    assert!(matches!(
        Dbpf::from_bytes(truncated),
        Err(DbpfError::OutOfBounds { .. })
    ));
}

#[test]
fn best_options_decode_the_same() {
    let script = ui_script(200);
    let fast = qfs::compress_with(&script, &CompressionOptions::FAST).unwrap();
    let best = qfs::compress_with(&script, &CompressionOptions::BEST).unwrap();
    assert!(best.len() < script.len());
    assert_eq!(qfs::decompress(&fast, script.len()).unwrap(), script);
    assert_eq!(qfs::decompress(&best, script.len()).unwrap(), script);
}
