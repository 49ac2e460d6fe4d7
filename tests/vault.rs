//! Credential vault: password-protected deployment keys and both config
//! files.

mod support;

use std::fs;

use kupydo::core::vault::generate_keypair;
use kupydo::error::{CipherError, ConfigError};
use kupydo::{
    DeploymentCredential, DeploymentPublicData, Error, KdfProfile, PrivateConfig, PublicConfig,
    Registry, SecretDiscovery, SecretStore,
};
use support::{TestProject, HEART_SOURCE};

const PASSWORD: &str = "correct horse battery staple";

fn credential() -> (DeploymentCredential, String, String) {
    let (secret, public) = generate_keypair();
    let id = DeploymentCredential::generate_id();
    let cred = DeploymentCredential::encrypt(PASSWORD, &secret, &id, KdfProfile::Testing).unwrap();
    (cred, secret.to_string(), public)
}

#[test]
fn test_credential_roundtrip() {
    support::init_tracing();
    let (cred, secret, _) = credential();

    let recovered = cred.decrypt(PASSWORD, KdfProfile::Testing).unwrap();
    assert_eq!(recovered.as_str(), secret);
    assert!(cred.validate().is_ok());
}

#[test]
fn test_credential_wrong_password() {
    let (cred, _, _) = credential();
    assert!(matches!(
        cred.decrypt("wrong", KdfProfile::Testing),
        Err(Error::Cipher(CipherError::CannotDecrypt))
    ));
}

#[test]
fn test_credential_swapped_parts_fail() {
    let (cred, _, _) = credential();
    let mut tampered = cred.clone();
    tampered.part2 = cred.part1.clone();
    assert!(tampered.decrypt(PASSWORD, KdfProfile::Testing).is_err());
}

#[test]
fn test_private_config_save_and_load() {
    let t = TestProject::new();
    let path = t.private_config_path();
    let (first, _, _) = credential();
    let (second, _, _) = credential();

    let mut config = PrivateConfig::load(&path).unwrap();
    assert!(config.deployments().is_empty());
    config.insert(first.clone()).unwrap();
    config.insert(second.clone()).unwrap();
    config.save().unwrap();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    let loaded = PrivateConfig::load(&path).unwrap();
    assert_eq!(loaded.deployments(), &[first.clone(), second]);
    assert_eq!(loaded.get(&first.id), Some(&first));
}

#[test]
fn test_private_config_rejects_shared_salt_on_load() {
    let t = TestProject::new();
    let path = t.private_config_path();
    let (first, _, _) = credential();
    let (mut second, _, _) = credential();
    second.salt = first.salt.clone();

    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, serde_json::to_string(&vec![first, second]).unwrap()).unwrap();

    assert!(matches!(
        PrivateConfig::load(&path),
        Err(Error::Config(ConfigError::Duplicate { field: "salt", .. }))
    ));
}

#[test]
fn test_private_config_insert_duplicate_id_keeps_config() {
    let t = TestProject::new();
    let (first, _, _) = credential();
    let (mut second, _, _) = credential();
    second.id = first.id.clone();

    let mut config = PrivateConfig::from_deployments(t.private_config_path(), vec![first]).unwrap();
    assert!(config.insert(second).is_err());
    assert_eq!(config.deployments().len(), 1);
}

#[test]
fn test_public_config_lifecycle() {
    let t = TestProject::new();
    t.write("deploy/prod/Heart.rs", HEART_SOURCE);
    t.write("deploy/prod/other.rs", "");
    let (cred, _, public) = credential();

    let entry = DeploymentPublicData {
        id: cred.id.clone(),
        alias: "prod".into(),
        path: "deploy/prod/Heart.rs".into(),
        pubkey: public.clone(),
    };
    let mut config = PublicConfig::load(&t.project).unwrap();
    config.insert(entry.clone()).unwrap();
    config.save().unwrap();

    let loaded = PublicConfig::load(&t.project).unwrap();
    assert_eq!(loaded.get_by_alias("prod"), Some(&entry));
    assert_eq!(
        loaded.get_by_entry(&t.root().join("deploy/prod/Heart.rs")),
        Some(&entry)
    );
    assert_eq!(loaded.recipients().unwrap().len(), 1);

    let wrong_file = DeploymentPublicData {
        id: DeploymentCredential::generate_id(),
        alias: "other".into(),
        path: "deploy/prod/other.rs".into(),
        pubkey: generate_keypair().1,
    };
    assert!(config.insert(wrong_file).is_err());
    assert_eq!(config.deployments().len(), 1);

    let secret_as_public = DeploymentPublicData {
        pubkey: generate_keypair().0.to_string(),
        alias: "leak".into(),
        id: DeploymentCredential::generate_id(),
        path: "deploy/prod/Heart.rs".into(),
    };
    assert!(matches!(
        secret_as_public.validate(&t.project),
        Err(Error::Cipher(CipherError::InvalidPublicKey(_)))
    ));
}

#[test]
fn test_unlocked_key_opens_sealed_store() {
    let t = TestProject::new();
    let heart = t.write("deploy/Heart.rs", HEART_SOURCE);
    let (cred, _, public) = credential();

    let mut public_config = PublicConfig::load(&t.project).unwrap();
    public_config
        .insert(DeploymentPublicData {
            id: cred.id.clone(),
            alias: "main".into(),
            path: "deploy/Heart.rs".into(),
            pubkey: public,
        })
        .unwrap();

    let registry = Registry::new();
    registry.enable();
    let discovery = SecretDiscovery::new(&registry);
    let caller = kupydo::core::source::CallerContext::new(&heart, 4);
    discovery.resolve(&caller, "password", "qwerty").unwrap();
    let secrets = registry.get_all_secrets().unwrap();

    let store_dir = t.root().join(".secrets");
    SecretStore::new(&store_dir, t.project.clone())
        .with_recipients(public_config.recipients().unwrap())
        .write(&secrets)
        .unwrap();
    let on_disk = fs::read_to_string(store_dir.join(secrets[0].tag())).unwrap();
    assert!(!on_disk.contains("qwerty"));

    let identity = cred.unlock(PASSWORD, KdfProfile::Testing).unwrap();
    let store = SecretStore::new(&store_dir, t.project.clone());
    assert_eq!(store.read_all(Some(&identity)).unwrap(), secrets);
    assert!(store.read_all(None).is_err());
}
