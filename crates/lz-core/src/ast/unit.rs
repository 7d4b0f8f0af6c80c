use crate::ast::{NodeMeta, Reference, VarDef};
use crate::source_map::file_id_for;
use crate::span::FileId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImportKind {
    /// `import x as y from "path"`, holding the exported name.
    Name(String),
    /// `import * as m from "path"`
    Module,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportMember {
    pub meta: NodeMeta,
    pub kind: ImportKind,
    pub local: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Import {
    pub meta: NodeMeta,
    pub source: String,
    pub members: Vec<ImportMember>,
}

impl Import {
    pub fn source(path: &str) -> Self {
        Self {
            meta: NodeMeta::fresh(),
            source: path.to_string(),
            members: Vec::new(),
        }
    }

    pub fn name(mut self, export: &str, local: &str) -> Self {
        self.members.push(ImportMember {
            meta: NodeMeta::fresh(),
            kind: ImportKind::Name(export.to_string()),
            local: local.to_string(),
        });
        self
    }

    pub fn module(mut self, local: &str) -> Self {
        self.members.push(ImportMember {
            meta: NodeMeta::fresh(),
            kind: ImportKind::Module,
            local: local.to_string(),
        });
        self
    }
}

/// `alias a.b as x`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alias {
    pub meta: NodeMeta,
    pub target: Reference,
    pub name: String,
}

/// `export a.b as x`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Export {
    pub meta: NodeMeta,
    pub target: Reference,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Library {
    pub meta: NodeMeta,
    pub name: String,
    pub exported: bool,
    pub vars: Vec<VarDef>,
}

impl Library {
    pub fn new(name: &str, vars: Vec<VarDef>) -> Self {
        Self {
            meta: NodeMeta::fresh(),
            name: name.to_string(),
            exported: false,
            vars,
        }
    }

    pub fn exported(name: &str, vars: Vec<VarDef>) -> Self {
        Self {
            exported: true,
            ..Self::new(name, vars)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Module {
    pub global_name: Option<String>,
    pub imports: Vec<Import>,
    pub aliases: Vec<Alias>,
    pub libraries: Vec<Library>,
    pub exports: Vec<Export>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global(mut self, name: &str) -> Self {
        self.global_name = Some(name.to_string());
        self
    }

    pub fn import(mut self, import: Import) -> Self {
        self.imports.push(import);
        self
    }

    pub fn alias(mut self, target: &str, name: &str) -> Self {
        self.aliases.push(Alias {
            meta: NodeMeta::fresh(),
            target: Reference::local(target),
            name: name.to_string(),
        });
        self
    }

    pub fn library(mut self, library: Library) -> Self {
        self.libraries.push(library);
        self
    }

    pub fn export(mut self, target: &str, name: &str) -> Self {
        self.exports.push(Export {
            meta: NodeMeta::fresh(),
            target: Reference::local(target),
            name: name.to_string(),
        });
        self
    }

    pub fn into_unit(self, path: &str) -> Unit {
        Unit::new(path, UnitKind::Module(self))
    }
}

/// Ad hoc definitions evaluated in the scope of an already loaded module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractiveSection {
    pub meta: NodeMeta,
    /// Path of the module whose members are in scope.
    pub module: String,
    pub vars: Vec<VarDef>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Interactive {
    pub sections: Vec<InteractiveSection>,
}

impl Interactive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section(mut self, module: &str, vars: Vec<VarDef>) -> Self {
        self.sections.push(InteractiveSection {
            meta: NodeMeta::fresh(),
            module: module.to_string(),
            vars,
        });
        self
    }

    pub fn into_unit(self, path: &str) -> Unit {
        Unit::new(path, UnitKind::Interactive(self))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UnitKind {
    Module(Module),
    Interactive(Interactive),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub meta: NodeMeta,
    pub path: String,
    pub file: FileId,
    pub kind: UnitKind,
}

impl Unit {
    pub fn new(path: &str, kind: UnitKind) -> Self {
        Self {
            meta: NodeMeta::fresh(),
            path: path.to_string(),
            file: file_id_for(path),
            kind,
        }
    }
}

/// The compilation units handed over by the module loader, in load order.
#[derive(Debug, Clone, Default)]
pub struct UnitSet {
    units: Vec<Unit>,
}

impl UnitSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, unit: Unit) -> Self {
        self.add(unit);
        self
    }

    /// Adds a unit, replacing an earlier one with the same path.
    pub fn add(&mut self, unit: Unit) {
        match self.units.iter_mut().find(|u| u.path == unit.path) {
            Some(existing) => *existing = unit,
            None => self.units.push(unit),
        }
    }

    pub fn get(&self, path: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.path == path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
