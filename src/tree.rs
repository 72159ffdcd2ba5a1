//! Reconstrucción del árbol de carpetas a partir de la lista plana.
//!
//! API pública:
//!   - `build_tree(&[Folder])`
//!   - `unreachable_folders(&[Folder])`
//!   - `sort_tree`, `ancestors`, `full_path`, `descendant_ids`.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::collate::CollationKey;
use crate::models::Folder;

/// Nodo del árbol: la carpeta (con `full_path` calculado) y sus hijas.
/// El endpoint `folders/tree/` del backend devuelve esta misma forma.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderNode {
    #[serde(flatten)]
    pub folder: Folder,
    #[serde(default)]
    pub children: Vec<FolderNode>,
}

impl FolderNode {
    pub fn id(&self) -> &str {
        &self.folder.id
    }

    /// Número de nodos del subárbol, incluido este.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(FolderNode::node_count).sum::<usize>()
    }

    pub fn find(&self, id: &str) -> Option<&FolderNode> {
        if self.folder.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

/// Índice padre -> hijas, en el orden de la colección de origen.
fn children_index(folders: &[Folder]) -> HashMap<&str, Vec<&Folder>> {
    let mut index: HashMap<&str, Vec<&Folder>> = HashMap::new();
    for folder in folders {
        if let Some(parent) = folder.parent_id() {
            index.entry(parent).or_default().push(folder);
        }
    }
    index
}

/// Construye el bosque de carpetas raíz (sin padre) con sus hijas.
///
/// El orden entre hermanas es el de la colección de entrada. Una carpeta cuyo
/// padre no existe (huérfana) no aparece ni en las raíces ni como hija de nadie.
pub fn build_tree(folders: &[Folder]) -> Vec<FolderNode> {
    let index = children_index(folders);
    let mut placed = HashSet::new();

    folders
        .iter()
        .filter(|folder| folder.is_root())
        .filter_map(|root| attach(root, None, &index, &mut placed))
        .collect()
}

fn attach<'a>(
    folder: &'a Folder,
    parent_path: Option<&str>,
    index: &HashMap<&str, Vec<&'a Folder>>,
    placed: &mut HashSet<&'a str>,
) -> Option<FolderNode> {
    // Ids repetidos: cada id se coloca una sola vez
    if !placed.insert(folder.id.as_str()) {
        return None;
    }

    let full_path = match parent_path {
        Some(parent) => format!("{parent}/{}", folder.name),
        None => folder.name.clone(),
    };

    let children = index
        .get(folder.id.as_str())
        .map(|children| {
            children
                .iter()
                .copied()
                .filter_map(|child| attach(child, Some(full_path.as_str()), index, placed))
                .collect()
        })
        .unwrap_or_default();

    let mut folder = folder.clone();
    folder.full_path = full_path;
    Some(FolderNode { folder, children })
}

/// Carpetas que no cuelgan de ninguna raíz: padre inexistente, descendientes
/// de una huérfana o ciclos. Se devuelven en el orden de entrada.
pub fn unreachable_folders(folders: &[Folder]) -> Vec<&Folder> {
    let index = children_index(folders);
    let mut reachable: HashSet<&str> = HashSet::new();
    let mut pending: Vec<&str> = folders
        .iter()
        .filter(|folder| folder.is_root())
        .map(|folder| folder.id.as_str())
        .collect();

    while let Some(id) = pending.pop() {
        if !reachable.insert(id) {
            continue;
        }
        if let Some(children) = index.get(id) {
            pending.extend(children.iter().map(|child| child.id.as_str()));
        }
    }

    folders
        .iter()
        .filter(|folder| !reachable.contains(folder.id.as_str()))
        .collect()
}

/// Ordena recursivamente las hermanas por nombre (colación del locale).
pub fn sort_tree(nodes: &mut [FolderNode]) {
    nodes.sort_by_cached_key(|node| CollationKey::new(&node.folder.name));
    for node in nodes.iter_mut() {
        sort_tree(&mut node.children);
    }
}

/// Cadena de carpetas desde la raíz hasta `id` (incluida), para migas de pan.
/// Devuelve `None` si el id no existe o la cadena no termina en una raíz.
pub fn ancestors<'a>(folders: &'a [Folder], id: &str) -> Option<Vec<&'a Folder>> {
    let by_id: HashMap<&str, &Folder> = folders.iter().map(|f| (f.id.as_str(), f)).collect();
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut current = by_id.get(id).copied()?;

    loop {
        if !seen.insert(current.id.as_str()) {
            return None;
        }
        chain.push(current);
        match current.parent_id() {
            None => break,
            Some(parent) => current = by_id.get(parent).copied()?,
        }
    }

    chain.reverse();
    Some(chain)
}

/// Ruta completa calculada ("Raíz/Sub/Hoja").
pub fn full_path(folders: &[Folder], id: &str) -> Option<String> {
    ancestors(folders, id).map(|chain| {
        chain
            .iter()
            .map(|folder| folder.name.as_str())
            .collect::<Vec<_>>()
            .join("/")
    })
}

/// Ids de todas las descendientes de `id`, en profundidad.
pub fn descendant_ids(folders: &[Folder], id: &str) -> Vec<String> {
    let index = children_index(folders);
    let mut out = Vec::new();
    let mut seen = HashSet::from([id]);
    let mut stack: Vec<&Folder> = index
        .get(id)
        .map(|children| children.iter().rev().copied().collect())
        .unwrap_or_default();

    while let Some(folder) = stack.pop() {
        if !seen.insert(folder.id.as_str()) {
            continue;
        }
        out.push(folder.id.clone());
        if let Some(children) = index.get(folder.id.as_str()) {
            stack.extend(children.iter().rev().copied());
        }
    }
    out
}
