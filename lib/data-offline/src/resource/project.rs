use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use lina_data_runtime::{
    package, ResourceId, ResourceIdentifier, ResourceLocator, RESOURCE_ID_CUSTOM_SPACE,
};
use lina_serialization::{archive, IStream, LoadResult, OStream, Versioned};
use log::{error, info, trace};

use crate::{
    packaging::PackagingSettings,
    resource::{DirectoryKey, DirectoryTree, Guid, ResourceDirectory},
    Error, Result,
};

/// Name of the folder next to the project file holding serialized resources.
pub const RESOURCE_CACHE_FOLDER: &str = "_LinaResourceCache";

/// Extension of serialized resources in the resource cache.
pub const RESOURCE_EXTENSION: &str = "linaresource";

/// Name of the root folder of every project.
pub const ROOT_DIRECTORY_NAME: &str = "Resources";

const FIRST_GUID: Guid = 1;

/// A file-backed Lina project.
///
/// The project owns the tree of [`ResourceDirectory`] nodes shown in the
/// editor, the counters issuing resource ids and directory guids, and the
/// packaging settings.
///
/// # Project layout
///
/// ```markdown
///  ./
///  |- Sandbox.linaproject
///  | + _LinaResourceCache/
///  | |- Resource_1000001.linaresource
///  | |- Resource_1000002.linaresource
/// ```
///
/// Each resource of the tree is serialized to its own file in the resource
/// cache, named after its id. The project file itself holds no resource data.
///
/// # Project file
///
/// The project file is a versioned envelope (see
/// [`lina_serialization::archive`]) with the payload:
///
/// ```markdown
/// | u64 resource id counter | project name | u64 guid counter |
/// | packaging settings | directory tree |
/// ```
///
/// Mutating the tree does not write anything, callers persist it with
/// [`Self::save_to_file`].
pub struct ProjectData {
    project_name: String,
    resource_id_counter: ResourceId,
    global_guid_counter: Guid,
    packaging: PackagingSettings,
    directories: DirectoryTree,
    path: PathBuf,
}

impl Default for ProjectData {
    fn default() -> Self {
        Self {
            project_name: String::new(),
            resource_id_counter: RESOURCE_ID_CUSTOM_SPACE,
            global_guid_counter: FIRST_GUID,
            packaging: PackagingSettings::default(),
            directories: DirectoryTree::new(ROOT_DIRECTORY_NAME, FIRST_GUID),
            path: PathBuf::new(),
        }
    }
}

impl Versioned for ProjectData {
    const VERSION: u32 = 1;

    fn save_to_stream(&self, out: &mut OStream) {
        out.write(&self.resource_id_counter)
            .write(&self.project_name)
            .write(&self.global_guid_counter);
        self.packaging.save_to_stream(out);
        self.directories.save_to_stream(out);
    }

    fn load_from_stream(&mut self, input: &mut IStream) -> lina_serialization::Result<()> {
        self.resource_id_counter = input.read()?;
        self.project_name = input.read()?;
        self.global_guid_counter = input.read()?;
        self.packaging = PackagingSettings::load_from_stream(input)?;
        self.directories = DirectoryTree::load_from_stream(input)?;
        Ok(())
    }
}

impl ProjectData {
    /// Creates an unsaved project with an empty root folder.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            project_name: name.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// Creates a project, writes it to `path` and removes any stale resource
    /// cache left next to it.
    pub fn create_empty_project(name: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self> {
        let project = Self::new(name, path);
        let cache_dir = project.resource_cache_dir();
        if cache_dir.exists() {
            fs::remove_dir_all(&cache_dir).map_err(|e| Error::Io(cache_dir.clone(), e))?;
        }
        project.save_to_file()?;
        info!("Created project {:?}", project.path);
        Ok(project)
    }

    /// Opens the project file at `path`.
    pub fn load_from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut project = Self::default();
        match archive::load_from_file(&path, &mut project) {
            LoadResult::Ok if project.is_consistent() => {
                project.path = path;
                Ok(project)
            }
            LoadResult::Ok => Err(Error::Load(path, LoadResult::Malformed)),
            result => Err(Error::Load(path, result)),
        }
    }

    /// Reads the project stored in a package 0 file.
    ///
    /// The returned project has no file path.
    pub fn load_from_package(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let payload = package::read_project_payload(path)?;
        let mut project = Self::default();
        match archive::from_bytes(payload, &mut project) {
            LoadResult::Ok if project.is_consistent() => Ok(project),
            LoadResult::Ok => Err(Error::Load(path.to_owned(), LoadResult::Malformed)),
            result => Err(Error::Load(path.to_owned(), result)),
        }
    }

    /// Checks what a well-formed stream cannot guarantee: the root is a
    /// folder and every guid is unique and was issued by the guid counter.
    fn is_consistent(&self) -> bool {
        let root = self.directories.root();
        if !self.directories.get(root).map_or(false, |dir| dir.is_folder) {
            error!("Project {} has no root folder", self.project_name);
            return false;
        }

        let mut guids = HashSet::new();
        for key in self.directories.descendants(root) {
            let guid = self.directories.get(key).map_or(0, ResourceDirectory::guid);
            if guid > self.global_guid_counter || !guids.insert(guid) {
                error!(
                    "Project {} has an invalid directory guid {} (counter at {})",
                    self.project_name, guid, self.global_guid_counter
                );
                return false;
            }
        }
        true
    }

    /// Writes the project to its file.
    pub fn save_to_file(&self) -> Result<()> {
        archive::save_to_file(&self.path, self)?;
        trace!("Saved project {:?}", self.path);
        Ok(())
    }

    /// Name of the project.
    pub fn name(&self) -> &str {
        &self.project_name
    }

    /// Renames the project.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.project_name = name.into();
    }

    /// Path of the project file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Changes where the project is saved.
    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = path.into();
    }

    /// Folder holding the project file.
    pub fn project_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Folder holding the serialized resources.
    pub fn resource_cache_dir(&self) -> PathBuf {
        self.project_dir().join(RESOURCE_CACHE_FOLDER)
    }

    /// Path of the serialized resource `id`.
    pub fn resource_path(&self, id: ResourceId) -> PathBuf {
        self.resource_cache_dir()
            .join(format!("Resource_{}.{}", id, RESOURCE_EXTENSION))
    }

    /// Expresses `path` relative to the project folder.
    ///
    /// Returns `None` for paths outside the project.
    pub fn to_relative_path(&self, path: impl AsRef<Path>) -> Option<PathBuf> {
        path.as_ref()
            .strip_prefix(self.project_dir())
            .ok()
            .map(Path::to_path_buf)
    }

    /// Issues a new resource id.
    pub fn consume_resource_id(&mut self) -> ResourceId {
        self.resource_id_counter += 1;
        self.resource_id_counter
    }

    /// Issues a new directory guid.
    pub fn consume_global_guid(&mut self) -> Guid {
        self.global_guid_counter += 1;
        self.global_guid_counter
    }

    /// Settings used when packaging the project.
    pub fn packaging_settings(&self) -> &PackagingSettings {
        &self.packaging
    }

    /// Settings used when packaging the project, for modification.
    pub fn packaging_settings_mut(&mut self) -> &mut PackagingSettings {
        &mut self.packaging
    }

    /// The resource tree.
    pub fn directories(&self) -> &DirectoryTree {
        &self.directories
    }

    /// Root folder of the resource tree.
    pub fn root(&self) -> DirectoryKey {
        self.directories.root()
    }

    /// Returns a directory.
    pub fn directory(&self, key: DirectoryKey) -> Option<&ResourceDirectory> {
        self.directories.get(key)
    }

    /// Returns a directory for modification.
    ///
    /// Use [`Self::rename_resource_directory`] to rename, which keeps the
    /// siblings sorted.
    pub fn directory_mut(&mut self, key: DirectoryKey) -> Option<&mut ResourceDirectory> {
        self.directories.get_mut(key)
    }

    /// Adds a directory described by `desc` under `parent`, with a new guid.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is not a directory of this project.
    pub fn create_resource_directory(
        &mut self,
        parent: DirectoryKey,
        desc: &ResourceDirectory,
    ) -> DirectoryKey {
        let guid = self.consume_global_guid();
        self.directories.insert(parent, desc, guid)
    }

    /// Removes `dir` and its descendants from the tree.
    ///
    /// Loaded resources and resource files are left untouched. Returns the
    /// number of removed directories.
    pub fn destroy_resource_directory(&mut self, dir: DirectoryKey) -> usize {
        self.directories.remove(dir)
    }

    /// Removes every descendant of `dir`.
    pub fn destroy_child_directories(&mut self, dir: DirectoryKey) -> usize {
        self.directories.remove_children(dir)
    }

    /// Adds a copy of `dir`, without its children, under `parent`.
    ///
    /// The copy gets a new guid but keeps the resource id of `dir`; copying
    /// the resource itself is up to the caller.
    pub fn duplicate_resource_directory(
        &mut self,
        parent: DirectoryKey,
        dir: DirectoryKey,
    ) -> Option<DirectoryKey> {
        let desc = self.directories.get(dir)?.clone();
        Some(self.create_resource_directory(parent, &desc))
    }

    /// Re-parents `dir` under `new_parent`.
    ///
    /// Returns `false` if `new_parent` is unknown or lies inside `dir`, and an
    /// error if it is not a folder.
    pub fn move_resource_directory(
        &mut self,
        dir: DirectoryKey,
        new_parent: DirectoryKey,
    ) -> Result<bool> {
        let parent = match self.directories.get(new_parent) {
            Some(parent) => parent,
            None => return Ok(false),
        };
        if !parent.is_folder {
            return Err(Error::NotAFolder(parent.name.clone()));
        }
        Ok(self.directories.move_to(dir, new_parent))
    }

    /// Renames `dir` and re-sorts its siblings.
    pub fn rename_resource_directory(&mut self, dir: DirectoryKey, name: impl Into<String>) {
        if let Some(node) = self.directories.get_mut(dir) {
            node.name = name.into();
            if let Some(parent) = node.parent() {
                self.directories.sort_children(parent);
            }
        }
    }

    /// Finds the directory of resource `id`.
    pub fn find_resource_directory(&self, id: ResourceId) -> Option<DirectoryKey> {
        self.directories
            .find_resource_directory(self.directories.root(), id)
    }

    /// Finds the directory with guid `guid`.
    pub fn find_by_guid(&self, guid: Guid) -> Option<DirectoryKey> {
        self.directories.find_by_guid(self.directories.root(), guid)
    }

    /// Finds the child of `dir` named `name`.
    pub fn child_by_name(&self, dir: DirectoryKey, name: &str) -> Option<DirectoryKey> {
        self.directories.child_by_name(dir, name)
    }

    /// Load request for the resource of `dir`, read from the resource cache.
    pub fn resource_identifier(&self, dir: DirectoryKey) -> Option<ResourceIdentifier> {
        let node = self.directories.get(dir)?;
        if node.is_folder {
            return None;
        }
        Some(ResourceIdentifier::new(
            node.resource_id,
            node.resource_tid,
            node.name.clone(),
            self.resource_path(node.resource_id).to_string_lossy(),
        ))
    }

    /// Load requests for every resource of the tree.
    pub fn resource_identifiers(&self) -> Vec<ResourceIdentifier> {
        self.directories
            .descendants(self.directories.root())
            .into_iter()
            .filter_map(|key| self.resource_identifier(key))
            .collect()
    }
}

impl ResourceLocator for ProjectData {
    fn resource_path(&self, id: ResourceId) -> PathBuf {
        Self::resource_path(self, id)
    }
}

#[cfg(test)]
mod tests {
    use lina_data_runtime::ResourceType;

    use super::*;

    const MODEL: ResourceType = ResourceType::new(b"Model");

    fn setup_project(dir: &Path) -> ProjectData {
        ProjectData::create_empty_project("Sandbox", dir.join("Sandbox.linaproject"))
            .expect("new project")
    }

    #[test]
    fn create_and_reopen() {
        let work_dir = tempfile::tempdir().expect("temp dir");
        let mut project = setup_project(work_dir.path());
        let root = project.root();

        let models = project.create_resource_directory(root, &ResourceDirectory::folder("Models"));
        let id = project.consume_resource_id();
        project.create_resource_directory(models, &ResourceDirectory::resource("duck.glb", id, MODEL));
        project.packaging_settings_mut().executable_name = "Sandbox".to_owned();
        project.save_to_file().expect("saved");

        let reopened = ProjectData::load_from_file(project.path()).expect("opened");
        assert_eq!(reopened.name(), "Sandbox");
        assert_eq!(reopened.packaging_settings().executable_name, "Sandbox");
        let duck = reopened.find_resource_directory(id).expect("found");
        let duck = reopened.directory(duck).unwrap();
        assert_eq!(duck.name, "duck.glb");
        assert_eq!(
            reopened.directory(duck.parent().unwrap()).unwrap().name,
            "Models"
        );

        // counters continue where they stopped
        let mut reopened = reopened;
        assert_eq!(reopened.consume_resource_id(), id + 1);
        assert_eq!(reopened.consume_global_guid(), 4);
    }

    #[test]
    fn ids_and_guids_are_unique() {
        let mut project = ProjectData::default();
        let root = project.root();
        let mut guids = vec![project.directory(root).unwrap().guid()];
        let mut ids = Vec::new();
        for i in 0..32 {
            let id = project.consume_resource_id();
            let key = project.create_resource_directory(
                root,
                &ResourceDirectory::resource(format!("r{}", i), id, MODEL),
            );
            guids.push(project.directory(key).unwrap().guid());
            ids.push(id);
        }
        assert!(ids.iter().all(|id| *id > RESOURCE_ID_CUSTOM_SPACE));
        guids.sort_unstable();
        guids.dedup();
        assert_eq!(guids.len(), 33);
        ids.dedup();
        assert_eq!(ids.len(), 32);
    }

    #[test]
    fn duplicate_gets_a_new_guid() {
        let mut project = ProjectData::default();
        let root = project.root();
        let models = project.create_resource_directory(root, &ResourceDirectory::folder("Models"));
        let duck = project.create_resource_directory(
            models,
            &ResourceDirectory::resource("duck.glb", 7, MODEL),
        );

        let copy = project
            .duplicate_resource_directory(root, models)
            .expect("duplicated");
        let copy = project.directory(copy).unwrap();
        assert_eq!(copy.name, "Models");
        assert!(copy.children().is_empty());
        assert_ne!(copy.guid(), project.directory(models).unwrap().guid());

        let duck_copy = project.duplicate_resource_directory(root, duck).unwrap();
        assert_eq!(project.directory(duck_copy).unwrap().resource_id, 7);
        assert_eq!(project.directories().len(), 5);
    }

    #[test]
    fn move_and_rename_keep_siblings_sorted() {
        let mut project = ProjectData::default();
        let root = project.root();
        let textures = project.create_resource_directory(root, &ResourceDirectory::folder("Textures"));
        let audio = project.create_resource_directory(root, &ResourceDirectory::folder("Audio"));
        let stone = project.create_resource_directory(
            root,
            &ResourceDirectory::resource("stone.png", 1_000_001, MODEL),
        );

        assert!(project.move_resource_directory(stone, textures).expect("moved"));
        assert!(matches!(
            project.move_resource_directory(audio, stone),
            Err(Error::NotAFolder(name)) if name == "stone.png"
        ));

        project.rename_resource_directory(audio, "Zounds");
        let names: Vec<_> = project
            .directory(root)
            .unwrap()
            .children()
            .iter()
            .map(|k| project.directory(*k).unwrap().name.clone())
            .collect();
        assert_eq!(names, ["Textures", "Zounds"]);

        assert_eq!(project.child_by_name(textures, "stone.png"), Some(stone));
        assert_eq!(project.destroy_child_directories(textures), 1);
        assert_eq!(project.find_resource_directory(1_000_001), None);
    }

    #[test]
    fn resource_paths() {
        let project = ProjectData::new("Sandbox", "/work/Sandbox/Sandbox.linaproject");
        assert_eq!(
            project.resource_path(1_000_042),
            Path::new("/work/Sandbox/_LinaResourceCache/Resource_1000042.linaresource")
        );
        assert_eq!(
            ResourceLocator::resource_path(&project, 1_000_042),
            project.resource_path(1_000_042)
        );
        assert_eq!(
            project.to_relative_path("/work/Sandbox/Sources/duck.glb"),
            Some(PathBuf::from("Sources/duck.glb"))
        );
        assert_eq!(project.to_relative_path("/elsewhere/duck.glb"), None);
    }

    #[test]
    fn identifiers_cover_every_resource() {
        let mut project = ProjectData::new("Sandbox", "/work/Sandbox.linaproject");
        let root = project.root();
        let models = project.create_resource_directory(root, &ResourceDirectory::folder("Models"));
        project.create_resource_directory(models, &ResourceDirectory::resource("a", 11, MODEL));
        project.create_resource_directory(root, &ResourceDirectory::resource("b", 12, MODEL));

        let mut ids: Vec<_> = project
            .resource_identifiers()
            .into_iter()
            .map(|identifier| identifier.id)
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, [11, 12]);
        assert!(project.resource_identifier(models).is_none());
    }

    #[test]
    fn inconsistent_projects_are_rejected() {
        let work_dir = tempfile::tempdir().expect("temp dir");

        let path = work_dir.path().join("Counter.linaproject");
        let mut project = ProjectData::new("Counter", &path);
        let root = project.root();
        project.create_resource_directory(root, &ResourceDirectory::folder("Models"));
        project.global_guid_counter = FIRST_GUID;
        project.save_to_file().expect("saved");
        assert!(matches!(
            ProjectData::load_from_file(&path),
            Err(Error::Load(_, LoadResult::Malformed))
        ));

        let path = work_dir.path().join("Root.linaproject");
        let mut project = ProjectData::new("Root", &path);
        let root = project.root();
        project.directory_mut(root).unwrap().is_folder = false;
        project.save_to_file().expect("saved");
        assert!(matches!(
            ProjectData::load_from_file(&path),
            Err(Error::Load(_, LoadResult::Malformed))
        ));

        let path = work_dir.path().join("Valid.linaproject");
        let mut project = ProjectData::new("Valid", &path);
        let root = project.root();
        project.create_resource_directory(root, &ResourceDirectory::folder("Models"));
        project.save_to_file().expect("saved");
        assert!(ProjectData::load_from_file(&path).is_ok());
    }

    #[test]
    fn version_mismatch_is_reported() {
        let work_dir = tempfile::tempdir().expect("temp dir");
        let path = work_dir.path().join("Old.linaproject");
        let mut out = OStream::new();
        out.write(&(ProjectData::VERSION + 1)).write(&0_u64);
        archive::write_raw_file(&path, out.data()).expect("written");

        assert!(matches!(
            ProjectData::load_from_file(&path),
            Err(Error::Load(_, LoadResult::VersionMismatch { .. }))
        ));
        assert!(matches!(
            ProjectData::load_from_file(work_dir.path().join("absent.linaproject")),
            Err(Error::Load(_, LoadResult::NotFound))
        ));
    }
}
