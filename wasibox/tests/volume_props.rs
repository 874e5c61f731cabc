//! Property tests for the volume invariants: reads are a pure function
//! of the tree, write/read round-trips are lossless, rename is
//! invertible, and directory enumeration is stable.

use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::HashSet;
use wasibox::volume::MemVolume;

fn file_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_.]{0,11}"
}

fn contents() -> impl Strategy<Value = Vec<u8>> {
    vec(any::<u8>(), 0..512)
}

fn distinct_names(count: usize) -> impl Strategy<Value = Vec<String>> {
    vec(file_name(), count..=count).prop_filter("names must be distinct", move |names| {
        names.iter().collect::<HashSet<_>>().len() == count
    })
}

proptest! {
    #[test]
    fn write_then_read_is_lossless(name in file_name(), payload in contents()) {
        let volume = MemVolume::new();
        let path = format!("/{}", name);

        volume.write_file(path.as_bytes(), payload.clone(), false).unwrap();

        prop_assert_eq!(volume.read_file(path.as_bytes()).unwrap(), payload.clone());
        prop_assert_eq!(volume.stat(path.as_bytes()).unwrap().size, payload.len() as u64);
    }

    #[test]
    fn reads_are_stable_without_mutations(
        names in distinct_names(4),
        payloads in vec(contents(), 4..=4),
    ) {
        let volume = MemVolume::new();

        for (name, payload) in names.iter().zip(&payloads) {
            let path = format!("/{}", name);
            volume.write_file(path.as_bytes(), payload.clone(), false).unwrap();
        }

        let listing = volume.readdir(b"/").unwrap();
        let stats: Vec<_> = names
            .iter()
            .map(|name| volume.stat(format!("/{}", name).as_bytes()).unwrap())
            .collect();

        // A second pass over the unchanged tree observes identical state.
        prop_assert_eq!(&listing, &volume.readdir(b"/").unwrap());
        for (name, stat) in names.iter().zip(&stats) {
            let again = volume.stat(format!("/{}", name).as_bytes()).unwrap();
            prop_assert_eq!(stat, &again);
        }
    }

    #[test]
    fn readdir_reflects_insertion_order(names in distinct_names(5)) {
        let volume = MemVolume::new();

        for name in &names {
            volume.write_file(format!("/{}", name).as_bytes(), &b""[..], false).unwrap();
        }

        let listed: Vec<_> = volume
            .readdir(b"/")
            .unwrap()
            .into_iter()
            .map(|(name, _)| String::from_utf8(name).unwrap())
            .collect();

        prop_assert_eq!(listed, names);
    }

    #[test]
    fn rename_there_and_back_restores_the_state(
        names in distinct_names(2),
        payload in contents(),
    ) {
        let volume = MemVolume::new();
        let src = format!("/{}", names[0]);
        let dst = format!("/{}", names[1]);

        volume.write_file(src.as_bytes(), payload.clone(), false).unwrap();
        let before = volume.stat(src.as_bytes()).unwrap();

        volume.rename(src.as_bytes(), dst.as_bytes()).unwrap();
        volume.rename(dst.as_bytes(), src.as_bytes()).unwrap();

        prop_assert_eq!(volume.read_file(src.as_bytes()).unwrap(), payload);
        prop_assert!(volume.stat(dst.as_bytes()).is_err());

        // The node itself moved, identity included.
        let after = volume.stat(src.as_bytes()).unwrap();
        prop_assert_eq!(before.ino, after.ino);
        prop_assert_eq!(before.size, after.size);
    }

    #[test]
    fn truncate_matches_resize_semantics(
        name in file_name(),
        payload in contents(),
        new_len in 0u64..1024,
    ) {
        let volume = MemVolume::new();
        let path = format!("/{}", name);

        volume.write_file(path.as_bytes(), payload.clone(), false).unwrap();
        volume.truncate(path.as_bytes(), new_len).unwrap();

        let mut expected = payload;
        expected.resize(new_len as usize, 0);
        prop_assert_eq!(volume.read_file(path.as_bytes()).unwrap(), expected);
    }
}
