use super::edit::{
    default_return, find_delegating_constructor_call, load_receiver, strip_annotations,
    DelegatingCall,
};
use super::Injector;
use crate::jvm::code::opcodes::*;
use crate::jvm::code::{CodeNode, Insn, TryCatchBlock};
use crate::jvm::{is_constructor_name, is_static_initializer_name, ClassNode, MethodNode, THROWABLE};
use crate::model::Model;
use crate::ProcessError;
use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};

pub const HANDLE_THROWABLE: (&str, &str) =
    ("handleThrowable", "(Ljava/lang/Throwable;Ljava/lang/Object;)V");
pub const METHOD_FINISHED: (&str, &str) = ("methodFinished", "(Ljava/lang/Object;)V");
pub const IS_OBJECT_CRASHING: (&str, &str) = ("isObjectCrashing", "(Ljava/lang/Object;)Z");

/// Prefix of view callbacks once they are moved out of the way of the safe superclass
pub const SAFE_PREFIX: &str = "safe_";

const VIEW: &str = "android/view/View";
const VIEW_GROUP: &str = "android/view/ViewGroup";
const ASYNC_TASK: &str = "android/os/AsyncTask";

/// View callbacks the safe superclasses intercept
const VIEW_METHODS: &[(&str, &str)] = &[
    ("performClick", "()Z"),
    ("onMeasure", "(II)V"),
    ("onDraw", "(Landroid/graphics/Canvas;)V"),
    ("onFinishInflate", "()V"),
    ("onLayout", "(ZIIII)V"),
    ("onSizeChanged", "(IIII)V"),
    ("onKeyDown", "(ILandroid/view/KeyEvent;)Z"),
    ("onKeyUp", "(ILandroid/view/KeyEvent;)Z"),
    ("onTrackballEvent", "(Landroid/view/MotionEvent;)Z"),
    ("onTouchEvent", "(Landroid/view/MotionEvent;)Z"),
    ("onFocusChanged", "(ZILandroid/graphics/Rect;)V"),
    ("onWindowFocusChanged", "(Z)V"),
    ("onAttachedToWindow", "()V"),
    ("onDetachedFromWindow", "()V"),
    ("onWindowVisibilityChanged", "(I)V"),
];

/// Framework views with no safe counterpart: their subclasses are treated like any other class
const EXCLUDED_VIEWS: &[&str] = &[
    "android/widget/AbsoluteLayout",
    "android/widget/AdapterView",
    "android/app/FragmentBreadCrumbs",
    "android/widget/GridLayout",
    "android/widget/SlidingDrawer",
    "android/widget/Toolbar",
    "android/media/tv/TvView",
    "android/widget/TextView",
    "android/widget/ImageView",
    "android/widget/AnalogClock",
    "android/inputmethodservice/KeyboardView",
    "android/app/MediaRouteButton",
    "android/widget/ProgressBar",
    "android/view/SurfaceView",
    "android/view/TextureView",
    "android/view/ViewStub",
    "android/widget/DialerFilter",
    "android/widget/TwoLineListItem",
];

/// Callbacks that are always shielded in implementations of [`AUTO_PROCESSED_TYPES`]
const AUTO_PROCESSED_METHODS: &[(&str, &str)] = &[
    ("onClick", "(Landroid/view/View;)V"),
    ("run", "()V"),
    ("onPreExecute", "()V"),
    ("doInBackground", "([Ljava/lang/Object;)Ljava/lang/Object;"),
    ("onPostExecute", "(Ljava/lang/Object;)V"),
    ("handleMessage", "(Landroid/os/Message;)V"),
];

const AUTO_PROCESSED_TYPES: &[&str] = &[
    "android/view/View$OnClickListener",
    "java/lang/Runnable",
    ASYNC_TASK,
    "android/os/Handler",
];

/// Framework views and the safe classes that replace them as direct superclasses
pub fn default_safe_classes() -> BTreeMap<String, String> {
    [
        ("android/view/View", "SafeView"),
        ("android/view/ViewGroup", "SafeViewGroup"),
        ("android/widget/RelativeLayout", "SafeRelativeLayout"),
        ("android/widget/FrameLayout", "SafeFrameLayout"),
        ("android/widget/LinearLayout", "SafeLinearLayout"),
    ]
    .iter()
    .map(|(framework, safe)| {
        (
            framework.to_string(),
            format!("com/facebook/ads/internal/shield/{}", safe),
        )
    })
    .collect()
}

/// Contains exceptions thrown by methods instead of letting them propagate
///
/// Shielded methods catch every `Throwable`, hand it to the handler's `handleThrowable` along with
/// the receiver (the class, for static methods) and return a zero value. Methods other than
/// constructors also return early when the handler reports the receiver as already crashing.
#[derive(Debug, Clone)]
pub struct CrashShieldInjector {
    /// Handler class (internal name). Without one, marker annotations are stripped and nothing
    /// else happens.
    pub handler: Option<String>,

    /// Descriptor of the annotation that turns shielding on for a class or method
    pub enable_annotation: Option<String>,

    /// Descriptor of the annotation that turns shielding off
    pub disable_annotation: Option<String>,

    /// Shield every constructor, regardless of annotations
    pub process_constructors: bool,

    /// Reroute view subclasses through the safe superclasses
    pub process_views: bool,

    /// Framework classes (internal names) and their safe replacements
    pub safe_classes: BTreeMap<String, String>,

    pub ignored_packages: Vec<String>,
}

impl Default for CrashShieldInjector {
    fn default() -> Self {
        CrashShieldInjector {
            handler: None,
            enable_annotation: None,
            disable_annotation: None,
            process_constructors: false,
            process_views: false,
            safe_classes: default_safe_classes(),
            ignored_packages: vec![],
        }
    }
}

impl Injector for CrashShieldInjector {
    fn ignored_packages(&self) -> &[String] {
        &self.ignored_packages
    }

    fn process_class(&self, class: &mut ClassNode, model: &Model) -> Result<(), ProcessError> {
        let class_default =
            self.take_decision(&mut class.visible_annotations, &mut class.invisible_annotations);

        // Markers come off everywhere, but interfaces and safe classes get nothing injected
        if class.is_interface() || self.safe_classes.values().any(|safe| *safe == class.name) {
            for method in &mut class.methods {
                self.take_decision(
                    &mut method.visible_annotations,
                    &mut method.invisible_annotations,
                );
            }
            return Ok(());
        }

        let closure = model.hierarchical_closure(&class.name);
        let is_view = self.process_views && is_view_class(&closure);
        let safe_super = class
            .super_name
            .as_ref()
            .and_then(|super_name| self.safe_classes.get(super_name))
            .cloned();

        for index in 0..class.methods.len() {
            let method = &mut class.methods[index];
            let method_decision = self.take_decision(
                &mut method.visible_annotations,
                &mut method.invisible_annotations,
            );

            let handler = match &self.handler {
                Some(handler) => handler.as_str(),
                None => continue,
            };
            if is_static_initializer_name(&method.name) || !method.has_code() {
                continue;
            }

            if is_constructor_name(&method.name) {
                let retargeted = match (self.process_views, &safe_super) {
                    (true, Some(safe)) => retarget_super_constructor(class, index, safe)?,
                    _ => false,
                };
                if !retargeted && self.process_constructors {
                    self.shield(class, index, handler)?;
                }
                continue;
            }

            if is_view {
                reroute_view_calls(class, index, safe_super.as_deref())?;
                let method = &mut class.methods[index];
                if is_view_method(&method.name, &method.descriptor) {
                    debug!("Renaming view callback {}.{}", class.name, method.name);
                    method.name = format!("{}{}", SAFE_PREFIX, method.name);
                }
                continue;
            }

            if is_auto_processed(&class.methods[index], &closure)
                || method_decision.or(class_default) == Some(true)
            {
                self.shield(class, index, handler)?;
            }
        }

        if self.handler.is_some() && self.process_views {
            if let Some(safe) = safe_super {
                debug!("Replacing superclass of {} with {}", class.name, safe);
                class.super_name = Some(safe);
            }
        }

        Ok(())
    }
}

impl CrashShieldInjector {
    /// Strip the marker annotations, returning `Some(true)` for enable, `Some(false)` for disable
    fn take_decision(
        &self,
        visible: &mut Vec<crate::jvm::AnnotationNode>,
        invisible: &mut Vec<crate::jvm::AnnotationNode>,
    ) -> Option<bool> {
        let enable = self
            .enable_annotation
            .as_deref()
            .map_or(false, |annotation| strip_annotations(visible, invisible, annotation));
        let disable = self
            .disable_annotation
            .as_deref()
            .map_or(false, |annotation| strip_annotations(visible, invisible, annotation));
        if enable {
            Some(true)
        } else if disable {
            Some(false)
        } else {
            None
        }
    }

    /// Wrap a method body in a catch-all handler
    ///
    /// Constructors are protected only after their delegating call. Ones where that call can't be
    /// singled out are left alone.
    fn shield(
        &self,
        class: &mut ClassNode,
        index: usize,
        handler: &str,
    ) -> Result<(), ProcessError> {
        let method = &class.methods[index];
        let is_constructor = is_constructor_name(&method.name);
        let is_static = method.is_static();

        let start = if is_constructor {
            let code = match method.decode_code(&class.constants)? {
                Some(code) => code,
                None => return Ok(()),
            };
            match find_delegating_constructor_call(&code, &class.name, class.super_name.as_deref()) {
                DelegatingCall::Unique(call) => call + 1,
                found => {
                    warn!(
                        "Not shielding constructor {}{} of {}: {}",
                        method.name,
                        method.descriptor,
                        class.name,
                        match found {
                            DelegatingCall::Missing => "no delegating constructor call",
                            _ => "more than one delegating constructor call",
                        }
                    );
                    return Ok(());
                }
            }
        } else {
            0
        };

        debug!("Shielding {}.{}{}", class.name, method.name, method.descriptor);
        let descriptor = method.descriptor.clone();
        let class_name = class.name.clone();
        let method = &mut class.methods[index];
        if let Some(code) = method.code_mut(&class.constants)? {
            protect(code, start, &class_name, &descriptor, is_static, handler);
            if !is_constructor {
                guard_crashing_receiver(code, &class_name, &descriptor, is_static, handler);
            }
        }
        Ok(())
    }
}

/// Put everything from `start` on under a handler that reports and returns a zero value
fn protect(
    code: &mut CodeNode,
    start: usize,
    class_name: &str,
    descriptor: &str,
    is_static: bool,
    handler: &str,
) {
    let try_start = code.fresh_label();
    let catch = code.fresh_label();
    code.insert_all(start, vec![Insn::Label(try_start)]);

    code.instructions.push(Insn::Label(catch));
    code.instructions.push(load_receiver(class_name, is_static));
    code.instructions
        .push(Insn::invoke_static(handler, HANDLE_THROWABLE.0, HANDLE_THROWABLE.1));
    code.instructions.extend(default_return(descriptor));

    code.try_catch_blocks.push(TryCatchBlock {
        start: try_start,
        end: catch,
        handler: catch,
        catch_type: Some(THROWABLE.to_owned()),
    });
}

/// Return early, before the protected range, if the receiver is already crashing
fn guard_crashing_receiver(
    code: &mut CodeNode,
    class_name: &str,
    descriptor: &str,
    is_static: bool,
    handler: &str,
) {
    let skip = code.fresh_label();
    let mut guard = vec![
        load_receiver(class_name, is_static),
        Insn::invoke_static(handler, IS_OBJECT_CRASHING.0, IS_OBJECT_CRASHING.1),
        Insn::Jump(IFEQ, skip),
    ];
    guard.extend(default_return(descriptor));
    guard.push(Insn::Label(skip));
    code.insert_all(0, guard);
}

/// Point the superclass constructor call at the safe superclass
fn retarget_super_constructor(
    class: &mut ClassNode,
    index: usize,
    safe: &str,
) -> Result<bool, ProcessError> {
    let super_name = match &class.super_name {
        Some(super_name) => super_name.as_str(),
        None => return Ok(false),
    };
    let mut code = match class.methods[index].decode_code(&class.constants)? {
        Some(code) => code,
        None => return Ok(false),
    };
    let call = match find_delegating_constructor_call(&code, &class.name, Some(super_name)) {
        DelegatingCall::Unique(call) => call,
        _ => return Ok(false),
    };
    match &mut code.instructions[call] {
        Insn::Method(_, member) if member.owner == super_name => member.owner = safe.to_owned(),
        _ => return Ok(false),
    }
    class.methods[index].set_code(code);
    Ok(true)
}

/// Rename `super` calls to view callbacks, and send them to the safe superclass if there is one
fn reroute_view_calls(
    class: &mut ClassNode,
    index: usize,
    safe_super: Option<&str>,
) -> Result<(), ProcessError> {
    let mut code = match class.methods[index].decode_code(&class.constants)? {
        Some(code) => code,
        None => return Ok(()),
    };
    let mut changed = false;
    for insn in &mut code.instructions {
        if let Insn::Method(INVOKESPECIAL, member) = insn {
            if is_view_method(&member.name, &member.descriptor) {
                member.name = format!("{}{}", SAFE_PREFIX, member.name);
                if let Some(safe) = safe_super {
                    member.owner = safe.to_owned();
                }
                changed = true;
            }
        }
    }
    if changed {
        class.methods[index].set_code(code);
    }
    Ok(())
}

fn is_view_method(name: &str, descriptor: &str) -> bool {
    VIEW_METHODS
        .iter()
        .any(|(view_name, view_descriptor)| *view_name == name && *view_descriptor == descriptor)
}

fn is_view_class(closure: &BTreeSet<String>) -> bool {
    (closure.contains(VIEW) || closure.contains(VIEW_GROUP))
        && !EXCLUDED_VIEWS.iter().any(|excluded| closure.contains(*excluded))
}

/// Is the method a callback of a listener, runnable, task or handler?
///
/// `AsyncTask` callbacks are matched by name only since their parameters are usually generic.
fn is_auto_processed(method: &MethodNode, closure: &BTreeSet<String>) -> bool {
    let descriptor_matches = AUTO_PROCESSED_METHODS
        .iter()
        .find(|(name, _)| *name == method.name)
        .map_or(false, |(_, descriptor)| {
            *descriptor == method.descriptor || closure.contains(ASYNC_TASK)
        });
    descriptor_matches && AUTO_PROCESSED_TYPES.iter().any(|typ| closure.contains(*typ))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::inject::test::{class, default_constructor, method};
    use crate::jvm::class_file::MemberRef;
    use crate::jvm::{AnnotationNode, ClassAccessFlags, MethodAccessFlags, OBJECT};

    const ENABLE: &str = "Lshield/Enable;";
    const DISABLE: &str = "Lshield/Disable;";
    const HANDLER: &str = "shield/Handler";

    fn injector() -> CrashShieldInjector {
        CrashShieldInjector {
            handler: Some(HANDLER.to_owned()),
            enable_annotation: Some(ENABLE.to_owned()),
            disable_annotation: Some(DISABLE.to_owned()),
            ..CrashShieldInjector::default()
        }
    }

    fn run(injector: &CrashShieldInjector, class: &mut ClassNode) {
        let mut model = Model::new();
        model.update(class);
        injector.process(class, &model).unwrap();
    }

    fn code(class: &ClassNode, index: usize) -> CodeNode {
        class.methods[index]
            .decode_code(&class.constants)
            .unwrap()
            .unwrap()
    }

    fn is_shielded(class: &ClassNode, index: usize) -> bool {
        !code(class, index).try_catch_blocks.is_empty()
    }

    fn returning_one() -> MethodNode {
        method(
            MethodAccessFlags::PUBLIC,
            "one",
            "()I",
            vec![Insn::Simple(ICONST_1), Insn::Simple(IRETURN)],
        )
    }

    fn handler_call(name: (&str, &str)) -> Insn {
        Insn::invoke_static(HANDLER, name.0, name.1)
    }

    #[test]
    fn annotated_method_is_shielded() {
        let mut shielded = class("a/C", OBJECT);
        let mut one = returning_one();
        one.visible_annotations.push(AnnotationNode::new(ENABLE));
        shielded.methods.push(one);
        run(&injector(), &mut shielded);

        assert!(shielded.methods[0].visible_annotations.is_empty(), "marker is stripped");
        let code = code(&shielded, 0);
        let insns = &code.instructions;
        assert_eq!(insns[0], Insn::aload(0));
        assert_eq!(insns[1], handler_call(IS_OBJECT_CRASHING));
        assert!(matches!(insns[2], Insn::Jump(IFEQ, _)));
        assert_eq!(&insns[3..5], &[Insn::Simple(ICONST_0), Insn::Simple(IRETURN)]);
        assert_eq!(
            &insns[7..9],
            &[Insn::Simple(ICONST_1), Insn::Simple(IRETURN)],
            "original body follows the guard"
        );
        assert_eq!(
            &insns[10..],
            &[
                Insn::aload(0),
                handler_call(HANDLE_THROWABLE),
                Insn::Simple(ICONST_0),
                Insn::Simple(IRETURN)
            ]
        );

        assert_eq!(code.try_catch_blocks.len(), 1);
        let block = &code.try_catch_blocks[0];
        assert_eq!(block.catch_type.as_deref(), Some(THROWABLE));
        assert_eq!(code.label_position(block.start), Some(6));
        assert_eq!(code.label_position(block.handler), Some(9));
        assert_eq!(block.end, block.handler);
    }

    #[test]
    fn static_methods_report_their_class() {
        let mut shielded = class("a/C", OBJECT);
        shielded.visible_annotations.push(AnnotationNode::new(ENABLE));
        shielded.methods.push(method(
            MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
            "name",
            "()Ljava/lang/String;",
            vec![Insn::ldc_string("x"), Insn::Simple(ARETURN)],
        ));
        run(&injector(), &mut shielded);

        assert!(shielded.visible_annotations.is_empty());
        let code = code(&shielded, 0);
        assert_eq!(code.instructions[0], Insn::ldc_class("a/C"));
        let tail = &code.instructions[code.instructions.len() - 4..];
        assert_eq!(
            tail,
            &[
                Insn::ldc_class("a/C"),
                handler_call(HANDLE_THROWABLE),
                Insn::Simple(ACONST_NULL),
                Insn::Simple(ARETURN)
            ]
        );
    }

    #[test]
    fn method_annotation_overrides_class() {
        let mut partly = class("a/C", OBJECT);
        partly.invisible_annotations.push(AnnotationNode::new(ENABLE));
        let mut excluded = returning_one();
        excluded.invisible_annotations.push(AnnotationNode::new(DISABLE));
        partly.methods.push(excluded);
        partly.methods.push(returning_one());
        run(&injector(), &mut partly);

        assert!(partly.methods[0].invisible_annotations.is_empty());
        assert!(!is_shielded(&partly, 0), "disabled on the method");
        assert!(is_shielded(&partly, 1), "enabled by the class");
    }

    #[test]
    fn disabled_policy_only_strips() {
        let mut untouched = class("a/C", OBJECT);
        let mut one = returning_one();
        one.visible_annotations.push(AnnotationNode::new(ENABLE));
        one.visible_annotations.push(AnnotationNode::new("La/Other;"));
        untouched.methods.push(one);

        let disabled = CrashShieldInjector {
            handler: None,
            ..injector()
        };
        run(&disabled, &mut untouched);

        assert_eq!(
            untouched.methods[0].visible_annotations,
            vec![AnnotationNode::new("La/Other;")]
        );
        assert!(!is_shielded(&untouched, 0));
    }

    #[test]
    fn constructors() {
        let mut constructed = class("a/C", OBJECT);
        constructed.methods.push(default_constructor(OBJECT));
        constructed.methods.push(method(
            MethodAccessFlags::PUBLIC,
            "<init>",
            "(Z)V",
            vec![
                Insn::aload(0),
                Insn::Method(INVOKESPECIAL, MemberRef::new("a/C", "<init>", "()V")),
                Insn::aload(0),
                Insn::Method(INVOKESPECIAL, MemberRef::new("a/C", "<init>", "()V")),
                Insn::Simple(RETURN),
            ],
        ));
        let shield = CrashShieldInjector {
            process_constructors: true,
            ..injector()
        };
        run(&shield, &mut constructed);

        let code = code(&constructed, 0);
        assert_eq!(code.instructions[0], Insn::aload(0), "no guard in constructors");
        assert_eq!(
            code.label_position(code.try_catch_blocks[0].start),
            Some(2),
            "protection starts after the super call"
        );

        assert!(!is_shielded(&constructed, 1), "two delegating calls are skipped");
        assert_eq!(self::code(&constructed, 1).instructions.len(), 5);
    }

    #[test]
    fn runnables_are_always_shielded() {
        let mut runnable = class("a/Task", OBJECT);
        runnable.interfaces.push(String::from("java/lang/Runnable"));
        runnable.methods.push(method(
            MethodAccessFlags::PUBLIC,
            "run",
            "()V",
            vec![Insn::Simple(RETURN)],
        ));
        runnable.methods.push(method(
            MethodAccessFlags::PUBLIC,
            "other",
            "()V",
            vec![Insn::Simple(RETURN)],
        ));
        run(&injector(), &mut runnable);

        assert!(is_shielded(&runnable, 0));
        assert!(!is_shielded(&runnable, 1));
    }

    #[test]
    fn views() {
        let mut view = class("a/MyView", VIEW);
        view.methods.push(default_constructor(VIEW));
        view.methods.push(method(
            MethodAccessFlags::PROTECTED,
            "onDraw",
            "(Landroid/graphics/Canvas;)V",
            vec![
                Insn::aload(0),
                Insn::aload(1),
                Insn::Method(
                    INVOKESPECIAL,
                    MemberRef::new(VIEW, "onDraw", "(Landroid/graphics/Canvas;)V"),
                ),
                Insn::Simple(RETURN),
            ],
        ));
        let mut annotated = returning_one();
        annotated.visible_annotations.push(AnnotationNode::new(ENABLE));
        view.methods.push(annotated);

        let shield = CrashShieldInjector {
            process_views: true,
            process_constructors: true,
            ..injector()
        };
        run(&shield, &mut view);

        let safe_view = "com/facebook/ads/internal/shield/SafeView";
        assert_eq!(view.super_name.as_deref(), Some(safe_view));
        assert_eq!(
            code(&view, 0).instructions[1],
            Insn::Method(INVOKESPECIAL, MemberRef::new(safe_view, "<init>", "()V")),
        );
        assert!(!is_shielded(&view, 0), "retargeted constructors aren't shielded");

        assert_eq!(view.methods[1].name, "safe_onDraw");
        assert_eq!(
            code(&view, 1).instructions[2],
            Insn::Method(
                INVOKESPECIAL,
                MemberRef::new(safe_view, "safe_onDraw", "(Landroid/graphics/Canvas;)V")
            )
        );

        assert!(
            view.methods[2].visible_annotations.is_empty(),
            "annotations are stripped in views too"
        );
        assert!(!is_shielded(&view, 2), "views are shielded by their superclass");
    }

    #[test]
    fn excluded_and_safe_classes() {
        let mut text = class("a/Label", "android/widget/TextView");
        let mut model = Model::new();
        model.update(&class("android/widget/TextView", VIEW));
        model.update(&text);
        let shield = CrashShieldInjector {
            process_views: true,
            ..injector()
        };
        shield.process(&mut text, &model).unwrap();
        assert_eq!(text.super_name.as_deref(), Some("android/widget/TextView"));

        let mut safe = class("com/facebook/ads/internal/shield/SafeView", VIEW);
        let mut one = returning_one();
        one.visible_annotations.push(AnnotationNode::new(ENABLE));
        safe.methods.push(one);
        run(&shield, &mut safe);
        assert_eq!(safe.super_name.as_deref(), Some(VIEW), "safe classes are skipped");
        assert!(!is_shielded(&safe, 0));
        assert!(
            safe.methods[0].visible_annotations.is_empty(),
            "safe classes still lose their markers"
        );
    }

    #[test]
    fn interfaces_are_stripped_but_not_shielded() {
        let mut iface = class("a/Iface", OBJECT);
        iface.access_flags |= ClassAccessFlags::INTERFACE | ClassAccessFlags::ABSTRACT;
        iface.invisible_annotations.push(AnnotationNode::new(ENABLE));
        let mut run_method =
            MethodNode::new(MethodAccessFlags::PUBLIC | MethodAccessFlags::ABSTRACT, "run", "()V");
        run_method.visible_annotations.push(AnnotationNode::new(DISABLE));
        iface.methods.push(run_method);
        let mut one = returning_one();
        one.access_flags |= MethodAccessFlags::STATIC;
        one.visible_annotations.push(AnnotationNode::new(ENABLE));
        iface.methods.push(one);
        run(&injector(), &mut iface);

        assert!(iface.invisible_annotations.is_empty(), "class marker is stripped");
        assert!(
            iface.methods[0].visible_annotations.is_empty(),
            "abstract method marker is stripped"
        );
        assert!(iface.methods[1].visible_annotations.is_empty());
        assert!(!is_shielded(&iface, 1), "nothing is injected into interfaces");
    }
}
