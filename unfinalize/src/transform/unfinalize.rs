use tracing::debug;

use crate::{
    classfile::{ClassFileResult, ClassModel, FieldAccess, Member},
    matcher::{HolderMarker, HolderMatcher},
};

/// Clears `final` on holder fields and returns how many fields changed.
///
/// Every field is eligible when the class is allow-listed, when the class
/// itself carries a holder marker, or when any of its fields carries the
/// item-stack-holder marker. Otherwise only fields carrying the
/// object-holder marker are. Only the flag is touched: names, descriptors
/// and `ConstantValue` attributes stay as they are. Fields that are already
/// non-final are not counted, so a second run reports zero.
pub fn unfinalize_holder_fields(
    class: &mut ClassModel,
    class_name: &str,
    matcher: &HolderMatcher,
) -> ClassFileResult<usize> {
    let mut whole_class = matcher.is_forced_transform_class(class_name);
    if !whole_class {
        let descriptors = class.annotation_descriptors()?;
        whole_class = matcher.has_any_marker(as_strs(&descriptors));
    }

    let mut eligible = Vec::with_capacity(class.fields.len());
    for field in &class.fields {
        let descriptors = class.member_annotation_descriptors(field)?;
        if matcher.has_marker_annotation(as_strs(&descriptors), HolderMarker::ItemStackHolder) {
            if !whole_class {
                debug!(
                    "{} field {} escalates to the whole class",
                    HolderMarker::ItemStackHolder,
                    field.name(&class.constant_pool)?
                );
            }
            whole_class = true;
        }
        eligible.push(
            matcher.has_marker_annotation(as_strs(&descriptors), HolderMarker::ObjectHolder),
        );
    }

    let mut modified = 0;
    for (field, eligible) in class.fields.iter_mut().zip(eligible) {
        if (whole_class || eligible) && field.is_final() {
            field.access.remove(FieldAccess::FINAL);
            modified += 1;
        }
    }
    Ok(modified)
}

fn as_strs<T: AsRef<str>>(descriptors: &[T]) -> impl Iterator<Item = &str> {
    descriptors.iter().map(|descriptor| descriptor.as_ref())
}
