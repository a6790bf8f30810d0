//! The shipped `.cl` files declare exactly the parameters the binaries bind.

use std::path::PathBuf;

use clbench::kernels::KernelFile;
use clbench::signature::{KernelSignature, ParamKind};
use clbench::{BenchError, MatmulVariant, PiProblem};

fn kernel_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(clbench::kernels::DEFAULT_KERNEL_DIR)
}

fn signature_of(file: KernelFile) -> KernelSignature {
    let source = file.load(&kernel_dir()).unwrap();
    KernelSignature::parse(&source, file.kernel_name()).unwrap()
}

#[test]
fn every_kernel_file_is_present() {
    for file in KernelFile::ALL {
        let path = file.path_in(&kernel_dir());
        assert!(path.is_file(), "missing {}", path.display());
    }
}

#[test]
fn matmul_variants_match_their_kernels() {
    for variant in MatmulVariant::ALL {
        let signature = signature_of(variant.kernel_file());
        assert_eq!(
            signature.kinds(),
            variant.params(),
            "{variant} binds arguments its kernel does not declare"
        );
        signature.check(&variant.params()).unwrap();
    }
}

#[test]
fn local_buffers_line_up_with_local_params() {
    let shape = clbench::MatmulShape::square(64).unwrap();
    for variant in MatmulVariant::ALL {
        let declared = variant
            .params()
            .iter()
            .filter(|k| **k == ParamKind::LocalF32)
            .count();
        assert_eq!(variant.local_buffers(&shape).len(), declared, "{variant}");
    }
}

#[test]
fn pi_kernel_matches_problem_params() {
    let signature = signature_of(KernelFile::SimplePi);
    assert_eq!(signature.name, "get_pi");
    assert_eq!(signature.kinds(), PiProblem::params());
}

#[test]
fn swapped_arguments_are_rejected() {
    let signature = signature_of(KernelFile::MatmulBlocked);
    let mut params = MatmulVariant::Blocked.params();
    params.swap(3, 4);
    match signature.check(&params).unwrap_err() {
        BenchError::ArgumentMismatch {
            kernel, position, ..
        } => {
            assert_eq!(kernel, "mmul");
            assert_eq!(position, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn asking_for_the_wrong_entry_point_fails() {
    let source = KernelFile::MatmulCore.load(&kernel_dir()).unwrap();
    assert!(matches!(
        KernelSignature::parse(&source, "mmul"),
        Err(BenchError::CompileFailure { .. })
    ));
}
