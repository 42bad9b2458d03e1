//! Solidity interface of the node registry contract.
//!
//! Only the functions and events used by the admin tooling are declared.

alloy_sol_types::sol! {
	interface NodeRegistry {
		struct Node {
			bytes signingKeyPub;
			string httpAddress;
			bool isReplicationEnabled;
			bool isApiEnabled;
			bool isActive;
			uint256 minMonthlyFee;
		}

		struct NodeWithId {
			uint256 nodeId;
			Node node;
		}

		event NodeAdded(
			uint256 indexed nodeId,
			address indexed owner,
			bytes signingKeyPub,
			string httpAddress,
			uint256 minMonthlyFee
		);
		event NodeActivateUpdated(uint256 indexed nodeId, bool isActive);
		event HttpAddressUpdated(uint256 indexed nodeId, string newHttpAddress);
		event ApiEnabledUpdated(uint256 indexed nodeId, bool isApiEnabled);
		event ReplicationEnabledUpdated(uint256 indexed nodeId, bool isReplicationEnabled);

		function addNode(
			address to,
			bytes calldata signingKeyPub,
			string calldata httpAddress,
			uint256 minMonthlyFee
		) external returns (uint256 nodeId);
		function updateActive(uint256 nodeId, bool isActive) external;
		function updateHttpAddress(uint256 nodeId, string calldata httpAddress) external;
		function updateIsApiEnabled(uint256 nodeId) external;
		function updateIsReplicationEnabled(uint256 nodeId, bool isReplicationEnabled) external;

		function getAllNodes() external view returns (NodeWithId[] memory allNodesList);
		function getNode(uint256 nodeId) external view returns (Node memory node);
		function ownerOf(uint256 tokenId) external view returns (address owner);
	}
}
