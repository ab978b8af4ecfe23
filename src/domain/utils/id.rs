use std::fmt;
use std::marker::PhantomData;

/// Numeric identifier tagged with the kind of entity it names.
///
/// Flow and node ids both come in as plain integers; the tag keeps them from
/// being mixed up while still ordering numerically (flow 2 sorts before flow 10).
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct Id<T> {
    pub id: u32,
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    pub fn new(id: u32) -> Self {
        Id { id, _marker: PhantomData }
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl<T> From<Id<T>> for u32 {
    fn from(id_wrapper: Id<T>) -> Self {
        id_wrapper.id
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full_name = std::any::type_name::<T>();
        let clean_name = full_name.split("::").last().unwrap_or(full_name);
        let display_name = clean_name.replace("Tag", "Id");

        write!(f, "{}: {}", display_name, self.id)
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct FlowTag;
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct NodeTag;

pub type FlowId = Id<FlowTag>;
pub type NodeId = Id<NodeTag>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_order_numerically() {
        let mut ids = vec![FlowId::new(10), FlowId::new(2), FlowId::new(7)];
        ids.sort();
        assert_eq!(ids, vec![FlowId::new(2), FlowId::new(7), FlowId::new(10)]);
    }

    #[test]
    fn test_debug_names_the_entity() {
        assert_eq!(format!("{:?}", FlowId::new(3)), "FlowId: 3");
        assert_eq!(format!("{:?}", NodeId::new(4)), "NodeId: 4");
        assert_eq!(NodeId::new(4).to_string(), "4");
    }
}
