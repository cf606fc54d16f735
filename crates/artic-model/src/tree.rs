//! Arena-backed articulated body tree.
//!
//! Links live in a slot map and refer to each other by [`LinkId`]. Children
//! form a singly linked sibling list in insertion order, which fixes the
//! preorder used by kinematics, dynamics and the diagnostic dump.

use std::collections::HashMap;
use std::fmt;
use std::ops::{Index, IndexMut};

use slotmap::SlotMap;

use crate::error::TreeError;
use crate::link::{BodyId, Link, LinkId};

/// A rooted tree of links forming one articulated body.
#[derive(Debug)]
pub struct BodyTree {
    id: BodyId,
    name: String,
    links: SlotMap<LinkId, Link>,
    root: LinkId,
}

impl BodyTree {
    pub fn new(name: impl Into<String>, root: Link) -> Self {
        let id = BodyId::fresh();
        let mut links = SlotMap::with_key();
        let root = links.insert(root.orphaned(Some(id)));
        Self {
            id,
            name: name.into(),
            links,
            root,
        }
    }

    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> LinkId {
        self.root
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id)
    }

    pub fn link_mut(&mut self, id: LinkId) -> Option<&mut Link> {
        self.links.get_mut(id)
    }

    pub fn contains(&self, id: LinkId) -> bool {
        self.links.contains_key(id)
    }

    /// Whether `id` is reachable from the root.
    pub fn is_attached(&self, id: LinkId) -> bool {
        self.links.get(id).is_some_and(|l| l.owner == Some(self.id))
    }

    pub fn parent(&self, id: LinkId) -> Option<LinkId> {
        self.links.get(id).and_then(|l| l.parent)
    }

    pub fn children(&self, id: LinkId) -> Children<'_> {
        Children {
            tree: self,
            next: self.links.get(id).and_then(|l| l.first_child),
        }
    }

    /// Attached link with the given name.
    pub fn find(&self, name: &str) -> Option<LinkId> {
        self.preorder()
            .into_iter()
            .find(|&id| self.links[id].name == name)
    }

    /// Adds a detached link to the arena.
    pub fn insert(&mut self, link: Link) -> LinkId {
        self.links.insert(link.orphaned(None))
    }

    /// Inserts `link` and attaches it under `parent`.
    pub fn push_child(&mut self, parent: LinkId, link: Link) -> Result<LinkId, TreeError> {
        if !self.links.contains_key(parent) {
            return Err(TreeError::UnknownLink(parent));
        }
        let id = self.insert(link);
        self.add_child(parent, id)?;
        Ok(id)
    }

    /// Attaches `child` (with its subtree) as the last child of `parent`,
    /// detaching it from any previous parent first.
    pub fn add_child(&mut self, parent: LinkId, child: LinkId) -> Result<(), TreeError> {
        for id in [parent, child] {
            if !self.links.contains_key(id) {
                return Err(TreeError::UnknownLink(id));
            }
        }
        if child == self.root {
            return Err(TreeError::RootReparent);
        }
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == child {
                return Err(TreeError::WouldCycle { parent, child });
            }
            cursor = self.links[id].parent;
        }

        if let Some(old) = self.links[child].parent {
            self.unlink(old, child);
        }
        self.links[child].parent = Some(parent);
        match self.last_child(parent) {
            Some(last) => self.links[last].next_sibling = Some(child),
            None => self.links[parent].first_child = Some(child),
        }
        let owner = self.links[parent].owner;
        self.set_owner(child, owner);
        Ok(())
    }

    /// Detaches `child` from `parent`. Returns `false` (and changes nothing)
    /// when `child` is not a direct child of `parent`.
    pub fn detach_child(&mut self, parent: LinkId, child: LinkId) -> bool {
        match self.links.get(child) {
            Some(link) if link.parent == Some(parent) => {}
            _ => return false,
        }
        self.unlink(parent, child);
        self.set_owner(child, None);
        true
    }

    /// Removes a detached subtree from the arena, returning how many links
    /// were dropped.
    pub fn discard(&mut self, id: LinkId) -> Result<usize, TreeError> {
        self.check_detached(id)?;
        let ids = self.subtree(id);
        for &link in &ids {
            self.links.remove(link);
        }
        Ok(ids.len())
    }

    /// Moves a detached subtree out into a tree of its own.
    pub fn split_off(
        &mut self,
        id: LinkId,
        name: impl Into<String>,
    ) -> Result<BodyTree, TreeError> {
        self.check_detached(id)?;
        let new_id = BodyId::fresh();
        let mut links = SlotMap::with_key();
        let root = self.copy_subtree(id, &mut links, Some(new_id));
        for link in self.subtree(id) {
            self.links.remove(link);
        }
        Ok(BodyTree {
            id: new_id,
            name: name.into(),
            links,
            root,
        })
    }

    /// Moves every attached link of `other` under `parent`. Returns the id of
    /// `other`'s former root in this arena.
    pub fn graft(&mut self, parent: LinkId, other: BodyTree) -> Result<LinkId, TreeError> {
        if !self.links.contains_key(parent) {
            return Err(TreeError::UnknownLink(parent));
        }
        let root = other.copy_subtree(other.root, &mut self.links, None);
        self.add_child(parent, root)?;
        Ok(root)
    }

    /// Disjoint copy of the attached links under a fresh [`BodyId`].
    pub fn deep_clone(&self) -> BodyTree {
        let id = BodyId::fresh();
        let mut links = SlotMap::with_key();
        let root = self.copy_subtree(self.root, &mut links, Some(id));
        BodyTree {
            id,
            name: self.name.clone(),
            links,
            root,
        }
    }

    /// Attached links, parents before children, siblings in insertion order.
    pub fn preorder(&self) -> Vec<LinkId> {
        self.subtree(self.root)
    }

    /// `id` and its descendants in preorder.
    pub fn subtree(&self, id: LinkId) -> Vec<LinkId> {
        let mut out = Vec::new();
        if !self.links.contains_key(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            let mark = stack.len();
            let mut child = self.links[current].first_child;
            while let Some(c) = child {
                stack.push(c);
                child = self.links[c].next_sibling;
            }
            // Reverse so the first child pops first.
            stack[mark..].reverse();
        }
        out
    }

    /// Number of links reachable from the root.
    pub fn link_count(&self) -> usize {
        self.preorder().len()
    }

    /// Number of links in the arena, detached ones included.
    pub fn arena_len(&self) -> usize {
        self.links.len()
    }

    /// Depth of `id` below the root (root = 0).
    pub fn depth(&self, id: LinkId) -> usize {
        let mut depth = 0;
        let mut cursor = self.parent(id);
        while let Some(p) = cursor {
            depth += 1;
            cursor = self.parent(p);
        }
        depth
    }

    pub fn iter(&self) -> impl Iterator<Item = (LinkId, &Link)> {
        self.links.iter()
    }

    fn check_detached(&self, id: LinkId) -> Result<(), TreeError> {
        let link = self.links.get(id).ok_or(TreeError::UnknownLink(id))?;
        if id == self.root || link.parent.is_some() {
            return Err(TreeError::StillAttached(id));
        }
        Ok(())
    }

    fn last_child(&self, parent: LinkId) -> Option<LinkId> {
        let mut last = self.links[parent].first_child?;
        while let Some(next) = self.links[last].next_sibling {
            last = next;
        }
        Some(last)
    }

    fn unlink(&mut self, parent: LinkId, child: LinkId) {
        let after = self.links[child].next_sibling;
        if self.links[parent].first_child == Some(child) {
            self.links[parent].first_child = after;
        } else {
            let mut cursor = self.links[parent].first_child;
            while let Some(c) = cursor {
                if self.links[c].next_sibling == Some(child) {
                    self.links[c].next_sibling = after;
                    break;
                }
                cursor = self.links[c].next_sibling;
            }
        }
        let link = &mut self.links[child];
        link.parent = None;
        link.next_sibling = None;
    }

    fn set_owner(&mut self, id: LinkId, owner: Option<BodyId>) {
        for link in self.subtree(id) {
            self.links[link].owner = owner;
        }
    }

    /// Copies the subtree at `from` into `dest`, preserving child order.
    fn copy_subtree(
        &self,
        from: LinkId,
        dest: &mut SlotMap<LinkId, Link>,
        owner: Option<BodyId>,
    ) -> LinkId {
        let mut mapped: HashMap<LinkId, LinkId> = HashMap::new();
        let mut tails: HashMap<LinkId, LinkId> = HashMap::new();
        for id in self.subtree(from) {
            let new = dest.insert(self.links[id].orphaned(owner));
            mapped.insert(id, new);
            if id == from {
                continue;
            }
            let Some(new_parent) = self.links[id].parent.and_then(|p| mapped.get(&p).copied())
            else {
                continue;
            };
            dest[new].parent = Some(new_parent);
            match tails.insert(new_parent, new) {
                Some(prev) => dest[prev].next_sibling = Some(new),
                None => dest[new_parent].first_child = Some(new),
            }
        }
        mapped[&from]
    }
}

impl Clone for BodyTree {
    fn clone(&self) -> Self {
        self.deep_clone()
    }
}

impl Index<LinkId> for BodyTree {
    type Output = Link;
    fn index(&self, id: LinkId) -> &Link {
        &self.links[id]
    }
}

impl IndexMut<LinkId> for BodyTree {
    fn index_mut(&mut self, id: LinkId) -> &mut Link {
        &mut self.links[id]
    }
}

/// Iterator over the direct children of a link.
pub struct Children<'a> {
    tree: &'a BodyTree,
    next: Option<LinkId>,
}

impl Iterator for Children<'_> {
    type Item = LinkId;
    fn next(&mut self) -> Option<LinkId> {
        let current = self.next?;
        self.next = self.tree.links.get(current).and_then(|l| l.next_sibling);
        Some(current)
    }
}

impl fmt::Display for BodyTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Body {} ({}), {} links", self.name, self.id, self.link_count())?;
        for id in self.preorder() {
            let link = &self.links[id];
            write!(f, "{link}")?;
            let parent = self
                .parent(id)
                .map(|p| self.links[p].name.as_str())
                .unwrap_or("-");
            writeln!(f, "  parent: {parent}")?;
            let children: Vec<&str> = self
                .children(id)
                .map(|c| self.links[c].name.as_str())
                .collect();
            writeln!(f, "  children: [{}]", children.join(", "))?;
        }
        Ok(())
    }
}
