//! Reflection contract and dispatch geometry shared by every platform.

use std::collections::BTreeMap;
use std::fmt;

/// Kind of resource a reflected parameter binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BindingKind {
    Buffer,
    Texture,
    Sampler,
    /// Workgroup (threadgroup) memory sized per dispatch.
    SharedMemory,
    /// Anything the binder does not manage. Ignored when building tables.
    Other,
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BindingKind::Buffer => "buffer",
            BindingKind::Texture => "texture",
            BindingKind::Sampler => "sampler",
            BindingKind::SharedMemory => "shared memory",
            BindingKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// A single reflected program parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingDescriptor {
    /// Parameter name as declared in the program.
    pub name: String,

    /// Binding slot assigned by the compiler.
    pub index: u32,

    /// Resource kind.
    pub kind: BindingKind,
}

impl BindingDescriptor {
    pub fn new(name: impl Into<String>, index: u32, kind: BindingKind) -> Self {
        Self {
            name: name.into(),
            index,
            kind,
        }
    }
}

/// Reflection data returned by pipeline creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReflection {
    pub bindings: Vec<BindingDescriptor>,
}

impl PipelineReflection {
    pub fn new(bindings: Vec<BindingDescriptor>) -> Self {
        Self { bindings }
    }

    /// Iterate over the bindings of one kind.
    pub fn of_kind(&self, kind: BindingKind) -> impl Iterator<Item = &BindingDescriptor> {
        self.bindings.iter().filter(move |b| b.kind == kind)
    }
}

/// Specialization constant values applied when resolving an entry point.
///
/// Values are stored as `f64`, which represents every concrete scalar type a
/// shader constant can have. Ordered by name so pipeline creation is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionConstants {
    values: BTreeMap<String, f64>,
}

impl FunctionConstants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a constant, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<f64>) {
        self.values.insert(name.into(), value.into());
    }

    /// Builder-style variant of [`set`](Self::set).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<f64>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<f64>> FromIterator<(K, V)> for FunctionConstants {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut constants = Self::new();
        for (name, value) in iter {
            constants.set(name, value);
        }
        constants
    }
}

/// Three-dimensional size used for grids, group sizes and group counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridSize {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl GridSize {
    pub const ONE: GridSize = GridSize::new(1, 1, 1);

    pub const fn new(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// A one-dimensional size.
    pub const fn linear(width: u32) -> Self {
        Self::new(width, 1, 1)
    }

    /// A two-dimensional size.
    pub const fn planar(width: u32, height: u32) -> Self {
        Self::new(width, height, 1)
    }

    /// Total number of elements covered.
    pub fn element_count(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.depth as u64
    }

    /// Number of groups of `group` size needed to cover `self`, rounding up.
    ///
    /// Zero-sized group dimensions are treated as one.
    pub fn div_ceil(&self, group: GridSize) -> GridSize {
        GridSize::new(
            self.width.div_ceil(group.width.max(1)),
            self.height.div_ceil(group.height.max(1)),
            self.depth.div_ceil(group.depth.max(1)),
        )
    }
}

impl From<[u32; 3]> for GridSize {
    fn from([width, height, depth]: [u32; 3]) -> Self {
        Self::new(width, height, depth)
    }
}

impl From<GridSize> for [u32; 3] {
    fn from(size: GridSize) -> Self {
        [size.width, size.height, size.depth]
    }
}

impl fmt::Display for GridSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.depth)
    }
}

/// How a command is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Explicit group size and group count.
    Threadgroups {
        group_size: GridSize,
        group_count: GridSize,
    },

    /// Total grid size; the platform derives the group count.
    Threads {
        grid_size: GridSize,
        group_size: GridSize,
    },
}

impl Dispatch {
    pub fn threadgroups(group_size: GridSize, group_count: GridSize) -> Self {
        Dispatch::Threadgroups {
            group_size,
            group_count,
        }
    }

    pub fn threads(grid_size: GridSize, group_size: GridSize) -> Self {
        Dispatch::Threads {
            grid_size,
            group_size,
        }
    }

    pub fn group_size(&self) -> GridSize {
        match self {
            Dispatch::Threadgroups { group_size, .. } | Dispatch::Threads { group_size, .. } => {
                *group_size
            }
        }
    }

    /// Number of groups launched. For `Threads` this rounds the grid up to
    /// whole groups.
    pub fn group_count(&self) -> GridSize {
        match self {
            Dispatch::Threadgroups { group_count, .. } => *group_count,
            Dispatch::Threads {
                grid_size,
                group_size,
            } => grid_size.div_ceil(*group_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_div_ceil_rounds_up() {
        let grid = GridSize::new(1000, 17, 1);
        let groups = grid.div_ceil(GridSize::new(64, 8, 1));
        assert_eq!(groups, GridSize::new(16, 3, 1));
    }

    #[test]
    fn test_div_ceil_zero_group_dimension() {
        let grid = GridSize::planar(10, 10);
        assert_eq!(grid.div_ceil(GridSize::new(0, 5, 0)), GridSize::new(10, 2, 1));
    }

    #[test]
    fn test_dispatch_group_count() {
        let threads = Dispatch::threads(GridSize::linear(130), GridSize::linear(64));
        assert_eq!(threads.group_count(), GridSize::linear(3));
        assert_eq!(threads.group_size(), GridSize::linear(64));

        let groups = Dispatch::threadgroups(GridSize::linear(32), GridSize::planar(4, 4));
        assert_eq!(groups.group_count(), GridSize::planar(4, 4));
    }

    #[test]
    fn test_function_constants_ordered() {
        let constants: FunctionConstants = [("b", 2.0), ("a", 1.0)].into_iter().collect();
        let names: Vec<&str> = constants.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(constants.get("b"), Some(2.0));
        assert_eq!(constants.with("a", 7u32).get("a"), Some(7.0));
    }

    #[test]
    fn test_binding_kind_display() {
        assert_eq!(BindingKind::SharedMemory.to_string(), "shared memory");
        assert_eq!(BindingKind::Buffer.to_string(), "buffer");
    }
}
