use std::fs;

use batch_engine::{Criterion, DirMediaStore, ImageMetadata, MediaStore};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn write_image(dir: &TempDir, relative: &str) {
    let path = dir.path().join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, b"\xFF\xD8fake-image-bytes").unwrap();
}

fn write_sidecar(dir: &TempDir, relative: &str, metadata: &ImageMetadata) {
    let path = dir.path().join(format!("{relative}.meta.json"));
    fs::write(path, serde_json::to_vec_pretty(metadata).unwrap()).unwrap();
}

#[test]
fn pages_come_back_in_stable_path_order() {
    let dir = TempDir::new().unwrap();
    write_image(&dir, "c.jpg");
    write_image(&dir, "a.jpg");
    write_image(&dir, "b/d.png");

    let store = DirMediaStore::new(dir.path());
    let page = store.select_page(0, 10, Criterion::All).unwrap();
    let names: Vec<String> = page
        .iter()
        .map(|record| {
            record
                .path
                .strip_prefix(dir.path())
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();

    assert_eq!(names, vec!["a.jpg", "b/d.png", "c.jpg"]);

    // A second scan returns the identical order.
    let again = store.select_page(0, 10, Criterion::All).unwrap();
    assert_eq!(page, again);
}

#[test]
fn inserting_an_image_does_not_reorder_existing_ones() {
    let dir = TempDir::new().unwrap();
    write_image(&dir, "a.jpg");
    write_image(&dir, "m.jpg");

    let store = DirMediaStore::new(dir.path());
    let before: Vec<_> = store
        .select_page(0, 2, Criterion::All)
        .unwrap()
        .iter()
        .map(|record| record.id)
        .collect();

    // A file that sorts after the existing page must not disturb it.
    write_image(&dir, "z.jpg");
    let after: Vec<_> = store
        .select_page(0, 2, Criterion::All)
        .unwrap()
        .iter()
        .map(|record| record.id)
        .collect();

    assert_eq!(before, after);
    assert_eq!(store.count_matching(Criterion::All).unwrap(), 3);
}

#[test]
fn missing_alt_criterion_filters_on_the_sidecar() {
    let dir = TempDir::new().unwrap();
    write_image(&dir, "has-alt.jpg");
    write_image(&dir, "no-alt.jpg");
    write_image(&dir, "blank-alt.jpg");
    write_sidecar(
        &dir,
        "has-alt.jpg",
        &ImageMetadata {
            alt: Some("A lighthouse at dusk".into()),
            ..ImageMetadata::default()
        },
    );
    write_sidecar(
        &dir,
        "blank-alt.jpg",
        &ImageMetadata {
            alt: Some("   ".into()),
            ..ImageMetadata::default()
        },
    );

    let store = DirMediaStore::new(dir.path());
    assert_eq!(store.count_matching(Criterion::All).unwrap(), 3);
    // Whitespace-only alt counts as missing.
    assert_eq!(store.count_matching(Criterion::MissingAlt).unwrap(), 2);

    let page = store.select_page(0, 10, Criterion::MissingAlt).unwrap();
    assert!(page
        .iter()
        .all(|record| !record.path.ends_with("has-alt.jpg")));
}

#[test]
fn metadata_writes_land_in_the_sidecar_and_survive_a_rescan() {
    let dir = TempDir::new().unwrap();
    write_image(&dir, "photo.jpg");

    let store = DirMediaStore::new(dir.path());
    let record = store
        .select_page(0, 1, Criterion::MissingAlt)
        .unwrap()
        .remove(0);

    let metadata = ImageMetadata {
        title: Some("Harbor at dawn".into()),
        alt: Some("Fishing boats moored in a misty harbor".into()),
        caption: None,
    };
    store.write_metadata(&record, &metadata).unwrap();

    let sidecar = dir.path().join("photo.jpg.meta.json");
    assert!(sidecar.exists());
    let reloaded: ImageMetadata =
        serde_json::from_str(&fs::read_to_string(&sidecar).unwrap()).unwrap();
    assert_eq!(reloaded, metadata);

    // The image left the missing-alt set.
    assert_eq!(store.count_matching(Criterion::MissingAlt).unwrap(), 0);
    assert_eq!(store.count_matching(Criterion::All).unwrap(), 1);
}

#[test]
fn rename_moves_image_and_sidecar_and_dodges_collisions() {
    let dir = TempDir::new().unwrap();
    write_image(&dir, "IMG_0001.jpg");
    write_sidecar(
        &dir,
        "IMG_0001.jpg",
        &ImageMetadata {
            title: Some("Sunset".into()),
            ..ImageMetadata::default()
        },
    );
    // A file already occupying the target stem.
    write_image(&dir, "sunset.jpg");

    let store = DirMediaStore::new(dir.path());
    let record = store
        .select_page(0, 10, Criterion::All)
        .unwrap()
        .into_iter()
        .find(|record| record.path.ends_with("IMG_0001.jpg"))
        .unwrap();

    let new_path = store.rename(&record, "sunset").unwrap();
    assert!(new_path.ends_with("sunset-1.jpg"));
    assert!(new_path.exists());
    assert!(!dir.path().join("IMG_0001.jpg").exists());
    assert!(dir.path().join("sunset-1.jpg.meta.json").exists());
    assert!(!dir.path().join("IMG_0001.jpg.meta.json").exists());
}

#[test]
fn non_image_files_are_ignored() {
    let dir = TempDir::new().unwrap();
    write_image(&dir, "real.png");
    fs::write(dir.path().join("notes.txt"), b"not an image").unwrap();
    fs::write(dir.path().join("real.png.meta.json"), b"{}").unwrap();

    let store = DirMediaStore::new(dir.path());
    assert_eq!(store.count_matching(Criterion::All).unwrap(), 1);
}
