use std::{collections::HashSet, path::Path};

use lina_data_offline::{packaging, ProjectData, ResourceDirectory};
use lina_data_runtime::{
    package,
    test_resource::{to_resource_bytes, TestMaterial, TestTexture, TestWorld},
    PackageType, Resource, ResourceId, ResourceManager, ResourceManagerMode,
    ResourceManagerOptions, ResourceManagerSettings, TypedResource, PACKAGE_0_FILENAME,
    PACKAGE_1_FILENAME,
};
use lina_serialization::{archive, IStream};

fn create_manager(dir: &Path, mode: ResourceManagerMode) -> ResourceManager {
    let settings = ResourceManagerSettings {
        metacache_folder: dir.join("Metacache"),
        package_0_path: dir.join(PACKAGE_0_FILENAME),
        package_1_path: dir.join(PACKAGE_1_FILENAME),
        worker_threads: 2,
        mode,
        ..ResourceManagerSettings::default()
    };
    ResourceManagerOptions::new()
        .with_settings(settings)
        .register_resource_type::<TestWorld>(PackageType::Project, &[])
        .register_resource_type::<TestMaterial>(PackageType::Resources, &[])
        .register_resource_type::<TestTexture>(PackageType::Resources, &["png"])
        .create()
        .expect("manager created")
}

fn add_resource(project: &mut ProjectData, resource: &dyn Resource) {
    let root = project.root();
    project.create_resource_directory(
        root,
        &ResourceDirectory::resource(resource.name(), resource.id(), resource.resource_type()),
    );
    archive::write_raw_file(project.resource_path(resource.id()), &to_resource_bytes(resource))
        .expect("resource written");
}

fn record_ids(bytes: Vec<u8>, skip_header: bool) -> Vec<ResourceId> {
    let mut input = IStream::new(bytes);
    if skip_header {
        let size: u32 = input.read().unwrap();
        input.skip_by(size as usize).unwrap();
    }
    let mut ids = Vec::new();
    loop {
        let id: ResourceId = input.read().unwrap();
        if id == lina_data_runtime::RESOURCE_ID_EOF {
            break;
        }
        let size: u32 = input.read().unwrap();
        input.skip_by(size as usize).unwrap();
        ids.push(id);
    }
    assert!(input.is_completed());
    ids
}

struct Sample {
    project: ProjectData,
    world: ResourceId,
    material: ResourceId,
    albedo: ResourceId,
    shader: ResourceId,
    unused: ResourceId,
}

fn sample_project(dir: &Path) -> Sample {
    let mut project = ProjectData::create_empty_project("Sandbox", dir.join("Sandbox.linaproject"))
        .expect("new project");
    let world = project.consume_resource_id();
    let material = project.consume_resource_id();
    let albedo = project.consume_resource_id();
    let shader = project.consume_resource_id();
    let unused = project.consume_resource_id();

    let texture = |id: ResourceId, name: &str| TestTexture {
        pixels: vec![id as u8; 16],
        ..TestTexture::create(id, name, "")
    };
    add_resource(
        &mut project,
        &TestWorld {
            resources: vec![albedo, material],
            ..TestWorld::create(world, "Level", "")
        },
    );
    add_resource(
        &mut project,
        &TestMaterial {
            shader,
            textures: vec![albedo],
            ..TestMaterial::create(material, "Stone", "")
        },
    );
    add_resource(&mut project, &texture(albedo, "stone.png"));
    add_resource(&mut project, &texture(shader, "lit.png"));
    add_resource(&mut project, &texture(unused, "unused.png"));

    project.packaging_settings_mut().world_ids_to_pack = vec![world, 999];
    project.save_to_file().expect("saved");
    Sample {
        project,
        world,
        material,
        albedo,
        shader,
        unused,
    }
}

#[test]
fn reload_keeps_tree() {
    let work_dir = tempfile::tempdir().expect("temp dir");
    let mut project =
        ProjectData::create_empty_project("Sandbox", work_dir.path().join("Sandbox.linaproject"))
            .expect("new project");
    let root = project.root();
    let models = project.create_resource_directory(root, &ResourceDirectory::folder("Models"));
    project.create_resource_directory(
        models,
        &ResourceDirectory::resource("duck.png", 42, TestTexture::TYPE),
    );
    project.save_to_file().expect("saved");

    let reloaded = ProjectData::load_from_file(project.path()).expect("opened");
    let models = reloaded
        .child_by_name(reloaded.root(), "Models")
        .expect("models folder");
    let models = reloaded.directory(models).unwrap();
    assert!(models.is_folder);
    assert_eq!(models.children().len(), 1);
    let duck = reloaded.directory(models.children()[0]).unwrap();
    assert_eq!(duck.resource_id, 42);
    assert_eq!(duck.resource_tid, TestTexture::TYPE);
}

#[test]
fn packaging_writes_each_dependency_once() {
    let work_dir = tempfile::tempdir().expect("temp dir");
    let sample = sample_project(work_dir.path());
    let out_dir = work_dir.path().join("Build");
    let mut manager = create_manager(work_dir.path(), ResourceManagerMode::File);

    let report = packaging::package_project(&sample.project, &mut manager, &out_dir)
        .expect("packaged");
    assert_eq!(
        report.packed,
        [sample.world, sample.material, sample.albedo, sample.shader]
    );
    assert_eq!(report.skipped, [999]);
    assert!(!report.packed.contains(&sample.unused));

    // resources opened for the dependency walk were closed
    for tid in [TestWorld::TYPE, TestMaterial::TYPE, TestTexture::TYPE] {
        assert!(manager.get_all_resources(tid, true).is_empty());
    }

    let package_0 = archive::read_raw_file(out_dir.join(PACKAGE_0_FILENAME)).unwrap();
    assert_eq!(record_ids(package_0, true), [sample.world]);
    let package_1 = archive::read_raw_file(out_dir.join(PACKAGE_1_FILENAME)).unwrap();
    assert_eq!(
        record_ids(package_1, false),
        [sample.material, sample.albedo, sample.shader]
    );

    let packaged = ProjectData::load_from_package(out_dir.join(PACKAGE_0_FILENAME))
        .expect("project in package");
    assert_eq!(packaged.name(), "Sandbox");
    assert_eq!(
        packaged.packaging_settings(),
        sample.project.packaging_settings()
    );
    assert!(packaged.find_resource_directory(sample.material).is_some());
}

#[test]
fn packaging_reuses_loaded_resources() {
    let work_dir = tempfile::tempdir().expect("temp dir");
    let sample = sample_project(work_dir.path());
    let mut manager = create_manager(work_dir.path(), ResourceManagerMode::File);

    let identifier = sample
        .project
        .resource_identifier(sample.project.find_resource_directory(sample.material).unwrap())
        .unwrap();
    manager.open_resource(&identifier).expect("opened");
    manager
        .get_resource_mut::<TestMaterial>(sample.material)
        .unwrap()
        .textures
        .push(sample.unused);

    let report = packaging::package_project(&sample.project, &mut manager, work_dir.path())
        .expect("packaged");
    // the live material is packed, not its file
    assert!(report.packed.contains(&sample.unused));
    assert!(manager
        .get_resource::<TestMaterial>(sample.material)
        .is_some());

    let package_1 = archive::read_raw_file(work_dir.path().join(PACKAGE_1_FILENAME)).unwrap();
    let found = package::scan_records(
        &mut IStream::new(package_1),
        PackageType::Resources,
        &HashSet::from([sample.material]),
    );
    assert_eq!(found.len(), 1);
    let mut packed = TestMaterial::create(sample.material, "Stone", "");
    packed
        .load_from_stream(&mut IStream::new(found[0].data.clone()))
        .expect("material record");
    assert_eq!(packed.textures, [sample.albedo, sample.unused]);
    assert_eq!(packed.shader, sample.shader);
}

#[test]
fn worlds_share_packed_resources() {
    let work_dir = tempfile::tempdir().expect("temp dir");
    let mut sample = sample_project(work_dir.path());
    let second_world = sample.project.consume_resource_id();
    add_resource(
        &mut sample.project,
        &TestWorld {
            resources: vec![sample.material, sample.albedo],
            ..TestWorld::create(second_world, "Outskirts", "")
        },
    );
    sample.project.packaging_settings_mut().world_ids_to_pack = vec![sample.world, second_world];

    let mut manager = create_manager(work_dir.path(), ResourceManagerMode::File);
    let report = packaging::package_project(&sample.project, &mut manager, work_dir.path())
        .expect("packaged");
    assert!(report.skipped.is_empty());
    assert_eq!(report.packed.len(), 5);

    let package_0 = archive::read_raw_file(work_dir.path().join(PACKAGE_0_FILENAME)).unwrap();
    assert_eq!(record_ids(package_0, true), [sample.world, second_world]);
    let package_1 = archive::read_raw_file(work_dir.path().join(PACKAGE_1_FILENAME)).unwrap();
    let ids = record_ids(package_1, false);
    for id in [sample.material, sample.albedo, sample.shader] {
        assert_eq!(ids.iter().filter(|packed| **packed == id).count(), 1);
    }
    assert_eq!(ids.len(), 3);
}

#[test]
fn packaged_resources_load_in_package_mode() {
    let work_dir = tempfile::tempdir().expect("temp dir");
    let sample = sample_project(work_dir.path());
    let mut editor = create_manager(work_dir.path(), ResourceManagerMode::File);
    packaging::package_project(&sample.project, &mut editor, work_dir.path()).expect("packaged");

    let packaged = ProjectData::load_from_package(work_dir.path().join(PACKAGE_0_FILENAME))
        .expect("project in package");
    let wanted: HashSet<_> = [sample.world, sample.material, sample.albedo, sample.shader]
        .into_iter()
        .collect();
    let identifiers: Vec<_> = packaged
        .resource_identifiers()
        .into_iter()
        .filter(|identifier| wanted.contains(&identifier.id))
        .collect();
    assert_eq!(identifiers.len(), 4);

    let mut game = create_manager(work_dir.path(), ResourceManagerMode::Package);
    game.load_resources_from_package(identifiers, 0)
        .expect("submitted");
    assert_eq!(game.wait_for_all(), vec![0]);

    assert_eq!(
        game.get_resource::<TestWorld>(sample.world).unwrap().resources,
        [sample.albedo, sample.material]
    );
    assert_eq!(
        game.get_resource::<TestMaterial>(sample.material).unwrap().shader,
        sample.shader
    );
    assert_eq!(
        game.get_resource::<TestTexture>(sample.shader).unwrap().pixels,
        vec![sample.shader as u8; 16]
    );
}

#[test]
fn verify_then_package() {
    let work_dir = tempfile::tempdir().expect("temp dir");
    let mut sample = sample_project(work_dir.path());
    std::fs::remove_file(sample.project.resource_path(sample.shader)).unwrap();

    let report = sample.project.verify_project_resources().expect("verified");
    assert_eq!(report.removed_directories, [sample.shader]);

    let mut manager = create_manager(work_dir.path(), ResourceManagerMode::File);
    let report = packaging::package_project(&sample.project, &mut manager, work_dir.path())
        .expect("packaged");
    assert_eq!(report.skipped, [999, sample.shader]);
    let package_1 = archive::read_raw_file(work_dir.path().join(PACKAGE_1_FILENAME)).unwrap();
    assert_eq!(record_ids(package_1, false), [sample.material, sample.albedo]);

    let package_0 = archive::read_raw_file(work_dir.path().join(PACKAGE_0_FILENAME)).unwrap();
    let mut input = IStream::new(package_0);
    let found = package::scan_records(
        &mut input,
        PackageType::Project,
        &HashSet::from([sample.world]),
    );
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, sample.world);
}
