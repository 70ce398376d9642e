use lina_data_runtime::{ResourceId, ResourceType};
use lina_serialization::{IStream, OStream, StringId};
use log::trace;
use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Handle of a [`ResourceDirectory`] inside its [`DirectoryTree`].
    pub struct DirectoryKey;
}

/// Globally unique id of a directory within a project.
pub type Guid = u64;

/// How the resource of a directory came to be.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ResourceDirectoryType {
    /// Imported from a file outside the project.
    ExternalSource,
    /// Created inside the editor.
    EngineCreated,
}

impl Default for ResourceDirectoryType {
    fn default() -> Self {
        Self::ExternalSource
    }
}

impl ResourceDirectoryType {
    fn to_raw(self) -> u8 {
        match self {
            Self::ExternalSource => 0,
            Self::EngineCreated => 1,
        }
    }

    fn from_raw(v: u8) -> Self {
        match v {
            1 => Self::EngineCreated,
            _ => Self::ExternalSource,
        }
    }
}

/// Editor state persisted with a directory.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct DirectoryUserData {
    /// Listed in the favourites panel.
    pub is_in_favourites: bool,
    /// Expanded in the resource browser.
    pub is_unfolded: bool,
}

/// One node of the project's resource tree, either a folder or a resource.
#[derive(Clone, Debug, Default)]
pub struct ResourceDirectory {
    /// Display name, unique among siblings by convention only.
    pub name: String,
    /// Path of the imported source file, relative to the project.
    pub source_path_relative_to_project: String,
    /// Folders hold children, resources do not.
    pub is_folder: bool,
    /// Id of the resource, 0 for folders.
    pub resource_id: ResourceId,
    /// Type of the resource.
    pub resource_tid: ResourceType,
    /// Origin of the resource.
    pub resource_type: ResourceDirectoryType,
    /// Hash of the source file's last modification stamp.
    pub last_modified_sid: StringId,
    /// Editor state.
    pub user_data: DirectoryUserData,
    guid: Guid,
    parent: Option<DirectoryKey>,
    children: Vec<DirectoryKey>,
}

impl ResourceDirectory {
    /// On-disk version of a directory node.
    pub const VERSION: u32 = 1;

    /// Describes a folder.
    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_folder: true,
            ..Self::default()
        }
    }

    /// Describes a resource.
    pub fn resource(name: impl Into<String>, id: ResourceId, tid: ResourceType) -> Self {
        Self {
            name: name.into(),
            resource_id: id,
            resource_tid: tid,
            ..Self::default()
        }
    }

    /// Unique id assigned when the directory was added to its tree.
    pub fn guid(&self) -> Guid {
        self.guid
    }

    /// Parent directory, `None` for the root.
    pub fn parent(&self) -> Option<DirectoryKey> {
        self.parent
    }

    /// Children in display order.
    pub fn children(&self) -> &[DirectoryKey] {
        &self.children
    }

    fn save_fields(&self, out: &mut OStream) {
        out.write(&Self::VERSION)
            .write(&self.name)
            .write(&self.source_path_relative_to_project)
            .write(&self.is_folder)
            .write(&self.resource_id)
            .write(&self.resource_tid)
            .write(&self.resource_type.to_raw())
            .write(&self.last_modified_sid)
            .write(&self.guid)
            .write(&self.user_data.is_in_favourites)
            .write(&self.user_data.is_unfolded);
    }

    fn load_fields(input: &mut IStream) -> lina_serialization::Result<Self> {
        input.read_version(Self::VERSION)?;
        Ok(Self {
            name: input.read()?,
            source_path_relative_to_project: input.read()?,
            is_folder: input.read()?,
            resource_id: input.read()?,
            resource_tid: input.read()?,
            resource_type: ResourceDirectoryType::from_raw(input.read()?),
            last_modified_sid: input.read()?,
            guid: input.read()?,
            user_data: DirectoryUserData {
                is_in_favourites: input.read()?,
                is_unfolded: input.read()?,
            },
            parent: None,
            children: Vec::new(),
        })
    }
}

/// Arena of [`ResourceDirectory`] nodes rooted at a single folder.
///
/// Nodes are addressed by [`DirectoryKey`]. A node's `parent` is a plain key
/// into the same arena, only the `children` lists define ownership. Children
/// are kept sorted: folders first, then by name.
pub struct DirectoryTree {
    nodes: SlotMap<DirectoryKey, ResourceDirectory>,
    root: DirectoryKey,
}

impl DirectoryTree {
    /// Creates a tree holding a single root folder.
    pub fn new(root_name: &str, root_guid: Guid) -> Self {
        let mut nodes = SlotMap::with_key();
        let mut root = ResourceDirectory::folder(root_name);
        root.guid = root_guid;
        let root = nodes.insert(root);
        Self { nodes, root }
    }

    /// Key of the root folder.
    pub fn root(&self) -> DirectoryKey {
        self.root
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always holds its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns a node.
    pub fn get(&self, key: DirectoryKey) -> Option<&ResourceDirectory> {
        self.nodes.get(key)
    }

    /// Returns a node for modification.
    ///
    /// Call [`Self::sort_children`] on the parent after renaming.
    pub fn get_mut(&mut self, key: DirectoryKey) -> Option<&mut ResourceDirectory> {
        self.nodes.get_mut(key)
    }

    /// Returns true if `key` is a node of this tree.
    pub fn contains(&self, key: DirectoryKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Adds a copy of `desc` under `parent` with the given guid.
    ///
    /// The children of `desc` are ignored. Folders carry no resource, their
    /// resource id and type are cleared.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is not a node of this tree.
    pub fn insert(
        &mut self,
        parent: DirectoryKey,
        desc: &ResourceDirectory,
        guid: Guid,
    ) -> DirectoryKey {
        let mut node = desc.clone();
        node.guid = guid;
        node.parent = Some(parent);
        node.children.clear();
        if node.is_folder {
            node.resource_id = 0;
            node.resource_tid = ResourceType::default();
        }
        let key = self.nodes.insert(node);
        self.nodes[parent].children.push(key);
        self.sort_children(parent);
        trace!("Created directory {} ({})", desc.name, guid);
        key
    }

    /// Unlinks `dir` from its parent and frees it with all its descendants.
    ///
    /// The root cannot be removed. Returns the number of freed nodes.
    pub fn remove(&mut self, dir: DirectoryKey) -> usize {
        if dir == self.root {
            log::warn!("The root directory cannot be destroyed");
            return 0;
        }
        if let Some(parent) = self.nodes.get(dir).and_then(ResourceDirectory::parent) {
            self.nodes[parent].children.retain(|child| *child != dir);
            self.sort_children(parent);
        }
        self.free_recursive(dir)
    }

    /// Frees every descendant of `dir`, keeping `dir` itself.
    pub fn remove_children(&mut self, dir: DirectoryKey) -> usize {
        let children = match self.nodes.get_mut(dir) {
            Some(node) => std::mem::take(&mut node.children),
            None => return 0,
        };
        children
            .into_iter()
            .map(|child| self.free_recursive(child))
            .sum()
    }

    fn free_recursive(&mut self, dir: DirectoryKey) -> usize {
        let mut stack = vec![dir];
        let mut freed = 0;
        while let Some(key) = stack.pop() {
            if let Some(node) = self.nodes.remove(key) {
                stack.extend(node.children);
                freed += 1;
            }
        }
        freed
    }

    /// Re-parents `dir` under `new_parent`.
    ///
    /// Returns false, leaving the tree unchanged, when `new_parent` is `dir`
    /// itself or one of its descendants, or when `dir` is the root.
    pub fn move_to(&mut self, dir: DirectoryKey, new_parent: DirectoryKey) -> bool {
        if dir == self.root || self.is_ancestor_or_self(dir, new_parent) {
            return false;
        }
        if let Some(old_parent) = self.nodes[dir].parent {
            self.nodes[old_parent].children.retain(|child| *child != dir);
        }
        self.nodes[dir].parent = Some(new_parent);
        self.nodes[new_parent].children.push(dir);
        self.sort_children(new_parent);
        true
    }

    /// Returns true if `ancestor` is `key` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: DirectoryKey, key: DirectoryKey) -> bool {
        let mut current = Some(key);
        while let Some(k) = current {
            if k == ancestor {
                return true;
            }
            current = self.nodes.get(k).and_then(ResourceDirectory::parent);
        }
        false
    }

    /// Orders the children of `dir`: folders first, then by name.
    ///
    /// The sort is stable, siblings with equal names keep their order.
    pub fn sort_children(&mut self, dir: DirectoryKey) {
        let mut children = std::mem::take(&mut self.nodes[dir].children);
        children.sort_by(|a, b| {
            let (a, b) = (&self.nodes[*a], &self.nodes[*b]);
            b.is_folder.cmp(&a.is_folder).then_with(|| a.name.cmp(&b.name))
        });
        self.nodes[dir].children = children;
    }

    /// Finds the child of `dir` named `name`.
    pub fn child_by_name(&self, dir: DirectoryKey, name: &str) -> Option<DirectoryKey> {
        self.nodes
            .get(dir)?
            .children
            .iter()
            .copied()
            .find(|child| self.nodes[*child].name == name)
    }

    /// Depth-first search from `from` for the node matching `pred`.
    pub fn find(
        &self,
        from: DirectoryKey,
        pred: impl Fn(&ResourceDirectory) -> bool,
    ) -> Option<DirectoryKey> {
        let mut stack = vec![from];
        while let Some(key) = stack.pop() {
            let node = self.nodes.get(key)?;
            if pred(node) {
                return Some(key);
            }
            stack.extend(node.children.iter().rev());
        }
        None
    }

    /// Finds the resource directory of resource `id` below `from`.
    pub fn find_resource_directory(
        &self,
        from: DirectoryKey,
        id: ResourceId,
    ) -> Option<DirectoryKey> {
        self.find(from, |dir| !dir.is_folder && dir.resource_id == id)
    }

    /// Finds the directory with guid `guid` below `from`.
    pub fn find_by_guid(&self, from: DirectoryKey, guid: Guid) -> Option<DirectoryKey> {
        self.find(from, |dir| dir.guid == guid)
    }

    /// Keys of `from` and all its descendants, in depth-first order.
    pub fn descendants(&self, from: DirectoryKey) -> Vec<DirectoryKey> {
        let mut keys = Vec::new();
        let mut stack = vec![from];
        while let Some(key) = stack.pop() {
            if let Some(node) = self.nodes.get(key) {
                keys.push(key);
                stack.extend(node.children.iter().rev());
            }
        }
        keys
    }

    /// Writes the whole tree in pre-order, each node followed by its child
    /// count.
    pub fn save_to_stream(&self, out: &mut OStream) {
        let mut stack = vec![self.root];
        while let Some(key) = stack.pop() {
            let node = &self.nodes[key];
            node.save_fields(out);
            out.write(&node.children.len());
            stack.extend(node.children.iter().rev());
        }
    }

    /// Reads a tree written by [`Self::save_to_stream`].
    ///
    /// Children keep their saved order.
    pub fn load_from_stream(input: &mut IStream) -> lina_serialization::Result<Self> {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(ResourceDirectory::load_fields(input)?);
        // nodes still expecting children, with the number left to read
        let mut pending: Vec<(DirectoryKey, usize)> = vec![(root, input.read()?)];

        while let Some((parent, remaining)) = pending.last_mut() {
            if *remaining == 0 {
                pending.pop();
                continue;
            }
            *remaining -= 1;
            let parent = *parent;

            let mut node = ResourceDirectory::load_fields(input)?;
            node.parent = Some(parent);
            let key = nodes.insert(node);
            nodes[parent].children.push(key);
            pending.push((key, input.read()?));
        }
        Ok(Self { nodes, root })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXTURE: ResourceType = ResourceType::new(b"Texture");

    fn names(tree: &DirectoryTree, dir: DirectoryKey) -> Vec<String> {
        tree.get(dir)
            .unwrap()
            .children()
            .iter()
            .map(|c| tree.get(*c).unwrap().name.clone())
            .collect()
    }

    fn sample() -> (DirectoryTree, DirectoryKey) {
        let mut tree = DirectoryTree::new("Resources", 1);
        let root = tree.root();
        tree.insert(root, &ResourceDirectory::resource("b.png", 10, TEXTURE), 2);
        let models = tree.insert(root, &ResourceDirectory::folder("Models"), 3);
        tree.insert(root, &ResourceDirectory::resource("a.png", 11, TEXTURE), 4);
        tree.insert(root, &ResourceDirectory::folder("Audio"), 5);
        tree.insert(models, &ResourceDirectory::resource("duck.glb", 12, TEXTURE), 6);
        (tree, models)
    }

    #[test]
    fn folders_sort_before_files() {
        let (mut tree, _) = sample();
        let root = tree.root();
        assert_eq!(names(&tree, root), ["Audio", "Models", "a.png", "b.png"]);

        // idempotent
        tree.sort_children(root);
        tree.sort_children(root);
        assert_eq!(names(&tree, root), ["Audio", "Models", "a.png", "b.png"]);
    }

    #[test]
    fn sort_is_case_sensitive_and_stable() {
        let mut tree = DirectoryTree::new("Resources", 1);
        let root = tree.root();
        tree.insert(root, &ResourceDirectory::folder("textures"), 2);
        tree.insert(root, &ResourceDirectory::folder("Textures"), 3);
        let first_dup = tree.insert(root, &ResourceDirectory::resource("x", 1, TEXTURE), 4);
        let second_dup = tree.insert(root, &ResourceDirectory::resource("x", 2, TEXTURE), 5);

        assert_eq!(names(&tree, root), ["Textures", "textures", "x", "x"]);
        let children = tree.get(root).unwrap().children();
        assert_eq!(&children[2..], &[first_dup, second_dup]);
    }

    #[test]
    fn folders_carry_no_resource() {
        let mut tree = DirectoryTree::new("Resources", 1);
        let root = tree.root();
        let mut desc = ResourceDirectory::resource("Models", 77, TEXTURE);
        desc.is_folder = true;

        let models = tree.insert(root, &desc, 2);
        let models = tree.get(models).unwrap();
        assert!(models.is_folder);
        assert_eq!(models.resource_id, 0);
        assert_eq!(models.resource_tid, ResourceType::default());
        assert_eq!(tree.find_resource_directory(root, 77), None);
    }

    #[test]
    fn search_by_id_and_guid() {
        let (tree, models) = sample();
        let root = tree.root();

        let duck = tree.find_resource_directory(root, 12).expect("found");
        assert_eq!(tree.get(duck).unwrap().name, "duck.glb");
        assert_eq!(tree.get(duck).unwrap().parent(), Some(models));
        assert_eq!(tree.find_by_guid(root, 6), Some(duck));
        assert_eq!(tree.find_by_guid(models, 6), Some(duck));

        assert_eq!(tree.find_resource_directory(models, 10), None);
        assert_eq!(tree.find_by_guid(root, 99), None);
        // folders carry no resource
        assert_eq!(tree.find_resource_directory(root, 0), None);
    }

    #[test]
    fn remove_frees_descendants() {
        let (mut tree, models) = sample();
        let root = tree.root();
        assert_eq!(tree.len(), 6);

        assert_eq!(tree.remove(models), 2);
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.find_resource_directory(root, 12), None);
        assert_eq!(names(&tree, root), ["Audio", "a.png", "b.png"]);

        assert_eq!(tree.remove(root), 0);
        assert_eq!(tree.remove_children(root), 3);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn move_keeps_the_tree_acyclic() {
        let (mut tree, models) = sample();
        let root = tree.root();
        let audio = tree.child_by_name(root, "Audio").expect("found");
        let duck = tree.find_resource_directory(root, 12).expect("found");

        assert!(!tree.move_to(models, models));
        assert!(!tree.move_to(root, audio));

        assert!(tree.move_to(models, audio));
        assert!(!tree.move_to(audio, duck));
        assert_eq!(names(&tree, root), ["Audio", "a.png", "b.png"]);
        assert_eq!(names(&tree, audio), ["Models"]);
        assert!(tree.is_ancestor_or_self(audio, duck));
    }

    #[test]
    fn stream_round_trip_preserves_order() {
        let (mut tree, models) = sample();
        {
            let duck = tree.child_by_name(models, "duck.glb").unwrap();
            let node = tree.get_mut(duck).unwrap();
            node.source_path_relative_to_project = "Sources/duck.glb".to_owned();
            node.last_modified_sid = StringId::compute_new("2024-01-01");
            node.resource_type = ResourceDirectoryType::EngineCreated;
            node.user_data.is_in_favourites = true;
        }
        tree.get_mut(models).unwrap().user_data.is_unfolded = true;

        let mut out = OStream::new();
        tree.save_to_stream(&mut out);
        let loaded = DirectoryTree::load_from_stream(&mut IStream::from(out)).expect("loaded");

        let tuples = |tree: &DirectoryTree| -> Vec<_> {
            tree.descendants(tree.root())
                .into_iter()
                .map(|k| {
                    let d = tree.get(k).unwrap();
                    (
                        d.name.clone(),
                        d.is_folder,
                        d.resource_id,
                        d.resource_tid,
                        d.guid(),
                        d.user_data,
                    )
                })
                .collect()
        };
        assert_eq!(tuples(&loaded), tuples(&tree));

        let duck = loaded.find_by_guid(loaded.root(), 6).unwrap();
        let duck = loaded.get(duck).unwrap();
        assert_eq!(duck.source_path_relative_to_project, "Sources/duck.glb");
        assert_eq!(duck.resource_type, ResourceDirectoryType::EngineCreated);
        assert_eq!(duck.last_modified_sid, StringId::compute_new("2024-01-01"));
        assert_eq!(
            loaded.get(duck.parent().unwrap()).unwrap().name,
            "Models"
        );
    }

    #[test]
    fn deep_nesting_round_trip() {
        const DEPTH: u64 = 100_000;
        let mut tree = DirectoryTree::new("Resources", 1);
        let mut parent = tree.root();
        for guid in 2..DEPTH + 2 {
            parent = tree.insert(parent, &ResourceDirectory::folder("Nested"), guid);
        }

        let mut out = OStream::new();
        tree.save_to_stream(&mut out);
        let mut input = IStream::from(out);
        let loaded = DirectoryTree::load_from_stream(&mut input).expect("loaded");
        assert!(input.is_completed());
        assert_eq!(loaded.len(), tree.len());

        let deepest = loaded.find_by_guid(loaded.root(), DEPTH + 1).expect("found");
        assert!(loaded.get(deepest).unwrap().children().is_empty());
        assert!(loaded.is_ancestor_or_self(loaded.root(), deepest));
    }
}
